// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;

use logforth_shared_file::Error;
use logforth_shared_file::append;
use logforth_shared_file::append::shared_file::SharedFile;
use logforth_shared_file::append::shared_file::SharedFileWriter;
use logforth_shared_file::append::shared_file::When;
use logforth_shared_file::layout::Layout;
use logforth_shared_file::record::Level;
use logforth_shared_file::record::Record;

#[derive(Debug)]
struct CustomLayout(&'static str);

impl Layout for CustomLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        log::debug!("formatting inside {}", self.0);
        Ok(format!("{} [{}] {}", self.0, record.level(), record.payload()).into_bytes())
    }
}

// logging from formatting code and from layouts must neither dead-lock nor recurse
#[test]
fn test_meta_logging_in_format_works() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("example.log");

    let stderr = append::Stderr::default().with_layout(CustomLayout("err"));
    let writer = SharedFileWriter::builder()
        .when(When::Seconds)
        .backup_count(10)
        .build(&path)
        .unwrap();
    let shared = SharedFile::new(writer).with_layout(CustomLayout("file"));

    logforth_shared_file::builder()
        .dispatch(|d| d.min_level(Level::Trace).append(stderr))
        .dispatch(|d| d.min_level(Level::Trace).append(shared))
        .apply();

    struct Thing<'a>(&'a str);

    impl std::fmt::Display for Thing<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            log::debug!("formatting wrapping ({})", self.0);
            f.write_str(self.0)
        }
    }

    log::info!("I'm logging {}!", Thing("aha"));
    log::logger().flush();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "file [INFO] I'm logging aha!\n"
    );
}
