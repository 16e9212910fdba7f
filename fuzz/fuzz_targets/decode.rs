#![no_main]
use encid::{MemoryKeyStore, Version};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    for version in [Version::V1, Version::V2] {
        let store = MemoryKeyStore::with_version(version);
        let _ = store.insert_key(1, b"0123456789abcdef".to_vec());
        let _ = encid::decode(&store, 1, &input);
        let _ = encid::decode50(&store, 1, &input);
    }
});
