//src/input.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Open BLAST results for reading. `None` reads standard input; a path
/// ending in `.gz` is decompressed on the fly.
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    let Some(path) = path else {
        log::info!("Reading BLAST results from standard input");
        return Ok(Box::new(BufReader::new(io::stdin())));
    };

    let f = File::open(path)?;
    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    log::info!("Reading BLAST results from {}", path.display());
    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}
