// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use oralscan::classifier::{Classification, Verdict};
use oralscan::upload::ImageUpload;

fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = serde_json::from_slice::<Classification>(data) {
        let verdict = parsed.verdict();
        let positive = parsed.result.to_lowercase().contains("positive");
        assert_eq!(verdict == Verdict::Positive, positive);
        assert!(parsed.confidence_text().ends_with('%'));
    }

    let upload = ImageUpload::new("fuzz", data.to_vec());
    assert!(upload.data_url().starts_with("data:"));
});
