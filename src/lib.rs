#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Bulk Loader

 One-shot batch loader seeding a document database from local JSON files.

 Each run reads a fixed list of source files, cleans every record, and writes
 the records into named collections with fixed-size, atomic batch writes. A
 second path folds key/value files into one configuration document.

 ## Core Concepts

- **Job:** the whole run. A `Job` is a sequence of `Step`s executed strictly in order.
- **Step:** one collection upload (chunk-oriented) or one configuration merge (tasklet).
- **ItemReader:** reads the source, one record at a time. Here a JSON array file.
- **ItemProcessor:** cleans a record. Here the blank-key filter, which may drop it.
- **ItemWriter:** writes one chunk of records at a time. Here MongoDB, or the log for dry runs.

 ## Pipeline

 For every `(collection, file)` of the [`manifest::Manifest`]:

 1. the file is checked, read and parsed as a JSON array of objects,
 2. keys that are blank once trimmed are removed, emptied records are dropped,
 3. the remaining records are cut into chunks of 400,
 4. each chunk is inserted as new documents in one atomic write, then the next.

 A missing file is skipped with a warning, a malformed file or a failed write
 is logged and the run goes on with the next entry.

 ## Features

| **Feature** | **Description**                                        |
|-------------|--------------------------------------------------------|
| mongodb     | Enables the MongoDB writers and the `bulk-loader` binary |
| full        | Enables all available features                          |

 ## Example

```rust
use bulk_loader::{
    loader::{LoggerDestination, run_manifest},
    manifest::{CollectionSource, Manifest},
};

let manifest = Manifest {
    collections: vec![CollectionSource {
        collection: "ports".to_string(),
        file: "missing/puertos.json".into(),
    }],
    config_files: vec![],
    chunk_size: None,
    transactional: None,
};

let execution = run_manifest(&manifest, &LoggerDestination, 400).unwrap();
assert_eq!(execution.skipped_steps().count(), 1);
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers / writers
pub mod item;

/// Single-shot steps
pub mod tasklet;

/// Key file of the destination store
pub mod credentials;

/// Upload table of a run
pub mod manifest;

/// Manifest to job wiring and destinations
pub mod loader;
