//! Test fixtures: receipt blobs, model answers and group members.

use receiptly_core::models::GroupMember;

/// What the model answers for the standard receipt.
pub const VISION_ANSWER: &str = "```json\n{\"date\": \"2024-03-01T12:30\", \"total\": 23.50, \
     \"merchant\": \"Albert Heijn\", \"currency_code\": \"EUR\", \
     \"category\": \"Groceries\", \"notes\": \"Branch Utrecht Centraal\"}\n```";

/// JPEG header padded with zeros to `size` bytes.
pub fn create_test_jpeg(size: usize) -> Vec<u8> {
    let mut jpeg = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00,
    ];
    jpeg.resize(size.max(jpeg.len()), 0);
    jpeg
}

pub fn members(count: usize) -> Vec<GroupMember> {
    const NAMES: [(&str, &str); 4] = [
        ("Alice", "Smith"),
        ("Bob", "Jones"),
        ("Carol", "White"),
        ("Dave", "Brown"),
    ];
    NAMES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, (first, last))| GroupMember {
            id: 100 + i as i64,
            first_name: first.to_string(),
            last_name: Some(last.to_string()),
        })
        .collect()
}
