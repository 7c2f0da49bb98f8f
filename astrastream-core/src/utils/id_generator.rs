use std::sync::Arc;
use tinyrand::RandRange;
use tinyrand_std::thread_rand;

const VALID_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CLIENT_ID_LENGTH: usize = 12;

pub fn mini_id(length: usize) -> Arc<str> {
    let mut rng = thread_rand();
    let mut id = String::with_capacity(length);
    let char_count = VALID_CHARS.len();

    for _ in 0..length {
        let idx = rng.next_range(0..char_count);
        id.push(VALID_CHARS[idx] as char);
    }

    Arc::from(id)
}

/// Draws ids until one is not `taken`.
pub fn unique_id(length: usize, taken: impl Fn(&str) -> bool) -> Arc<str> {
    loop {
        let id = mini_id(length);
        if !taken(&id) {
            return id;
        }
    }
}
