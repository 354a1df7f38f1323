/*
 * Copyright 2018 Bitwise IO, Inc.
 * Copyright 2019 Cargill Incorporated
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 * -----------------------------------------------------------------------------
 */

extern crate protobuf_codegen_pure;

use protobuf_codegen_pure::Customize;

use std::env;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const PROTO_FILES: &[&str] = &[
    "chaincode",
    "collection",
    "common",
    "msp_principal",
    "policies",
    "proposal",
    "rwset",
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("protos");
    let proto_path = Path::new("./protos");
    fs::create_dir_all(&dest_path).unwrap();

    let inputs = PROTO_FILES
        .iter()
        .map(|name| {
            let path = proto_path.join(format!("{}.proto", name));
            println!("cargo:rerun-if-changed={}", path.display());
            path.to_str().unwrap().to_string()
        })
        .collect::<Vec<_>>();

    // Generate the rust-protobuf messages without requiring protoc
    protobuf_codegen_pure::Codegen::new()
        .out_dir(&dest_path.to_str().unwrap())
        .inputs(&inputs)
        .include(proto_path.to_str().unwrap())
        .customize(Customize::default())
        .run()
        .expect("Protobuf codegen error");

    // Create mod.rs accordingly
    let mod_content = PROTO_FILES
        .iter()
        .map(|name| format!("pub mod {};\n", name))
        .collect::<String>();
    let mut mod_file = File::create(dest_path.join("mod.rs")).unwrap();
    mod_file.write_all(mod_content.as_bytes()).unwrap();
}
