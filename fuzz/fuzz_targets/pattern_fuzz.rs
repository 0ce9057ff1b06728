#![no_main]

// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.
use libfuzzer_sys::fuzz_target;
use messagelane::pattern::LikePattern;

fuzz_target!(|input: (&str, &str)| {
    let (pattern, text) = input;
    let pattern = LikePattern::new(pattern);

    // This MUST NOT panic
    let _ = pattern.matches(text);

    // A lone `%` matches everything.
    assert!(LikePattern::new("%").matches(text));
});
