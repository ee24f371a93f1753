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

//! Run several copies at once to watch them share one file:
//!
//! ```shell
//! for w in 1 2 3; do cargo run --example shared_file -- worker-$w & done; wait
//! ```

use logforth_shared_file::append::Stderr;
use logforth_shared_file::append::shared_file::SharedFile;
use logforth_shared_file::append::shared_file::SharedFileWriter;
use logforth_shared_file::append::shared_file::When;
use logforth_shared_file::layout::TextLayout;
use logforth_shared_file::record::Level;

fn main() {
    let worker = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "worker-0".to_string());

    let writer = SharedFileWriter::builder()
        .when(When::Seconds)
        .backup_count(10)
        .build("logs/example.log")
        .unwrap();

    logforth_shared_file::builder()
        .dispatch(|d| {
            d.min_level(Level::Trace)
                .append(SharedFile::new(writer).with_layout(TextLayout::new("example")))
        })
        .dispatch(|d| d.min_level(Level::Info).append(Stderr::default()))
        .worker(worker)
        .apply();

    let repeat = 5;

    for i in 0..repeat {
        log::error!("Hello error!");
        log::warn!("Hello warn!");
        log::info!("Hello info!");
        log::debug!("Hello debug!");
        log::trace!("Hello trace!");

        if i + 1 < repeat {
            std::thread::sleep(std::time::Duration::from_millis(700));
        }
    }
}
