// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disassembles hex bytes with the example x86 decoder.
//!
//! Usage: `x86dis [--trace] [HEX...]`. Without hex arguments a built-in sample is decoded.
//!
//! Shows:
//! - Running a CPS decoder through `Runtime` one instruction at a time
//! - Pretty-printing the decoded instruction trees
//! - Value tracing and arena statistics via `PrintTraceSink`

use std::process::ExitCode;

use decode_rt::trace::{PrintTraceSink, TraceMask, TraceSink};
use decode_rt_examples::x86::Disassembler;

const SAMPLE: &[u8] = &[
    0x90, // NOP
    0x4b, // INC EBX
    0xb8, 0x78, 0x56, 0x34, 0x12, // MOV EAX, 0x12345678
    0x89, 0x18, // MOV [EAX], EBX
    0x89, 0x43, 0x10, // MOV [EBX+0x10], EAX
    0xeb, 0xf0, // JMP -16
    0xc3, // RET
];

fn parse_hex(args: &[String]) -> Result<Vec<u8>, String> {
    let digits: String = args.concat().chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("'{c}' is not a hex digit"));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{digits}'"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = &digits[i..i + 2];
            u8::from_str_radix(pair, 16).map_err(|e| format!("bad hex byte '{pair}': {e}"))
        })
        .collect()
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let trace = args.first().is_some_and(|a| a == "--trace");
    if trace {
        args.remove(0);
    }
    let bytes = if args.is_empty() {
        SAMPLE.to_vec()
    } else {
        match parse_hex(&args) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("ERROR:{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut dis = match Disassembler::new() {
        Ok(dis) => dis,
        Err(e) => {
            eprintln!("ERROR:{e}");
            return ExitCode::FAILURE;
        }
    };
    let mut sink = PrintTraceSink;
    let mask = if trace { sink.mask() } else { TraceMask::NONE };

    let mut offset = 0;
    while offset < bytes.len() {
        let sink: Option<&mut dyn TraceSink> = if trace { Some(&mut sink) } else { None };
        match dis.decode_at(&bytes, offset, mask, sink) {
            Ok(line) => {
                let encoded: Vec<String> = bytes[offset..offset + line.len]
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect();
                println!("{offset:08x}  {:<20}  {}", encoded.join(" "), line.text);
                offset += line.len.max(1);
            }
            Err(e) => {
                eprintln!("ERROR:{e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
