//! Multipart request body processing.
//!
//! Streams boundary-framed parts: file parts are spooled to uniquely named
//! temp files under the configured storage path, field parts are collected in
//! memory. The resulting collections feed the transaction's variable store.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};

use super::mime::parse_media_type;
use super::{BodyProcessor, CollectionsMap, Options};
use crate::error::{Error, Result};
use crate::variables::RuleVariable;

/// Prefix for spooled upload files.
const SPOOL_PREFIX: &str = "crzmp";

/// Body processor for `multipart/*` request bodies.
#[derive(Debug, Default)]
pub struct MultipartProcessor {
    collections: CollectionsMap,
}

impl MultipartProcessor {
    /// Create an empty processor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BodyProcessor for MultipartProcessor {
    fn read(&mut self, reader: &mut dyn Read, options: &Options) -> Result<()> {
        let (media_type, params) = parse_media_type(&options.mime)?;
        if !media_type.starts_with("multipart/") {
            return Err(Error::NotMultipart);
        }
        let boundary = params
            .get("boundary")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::MalformedMediaType {
                value: options.mime.clone(),
            })?;
        let delimiter = format!("--{boundary}").into_bytes();

        let mut reader = BufReader::new(reader);
        let mut total_size: u64 = 0;
        let mut file_names = Vec::new();
        let mut file_arg_names = Vec::new();
        let mut file_tmp_names = Vec::new();
        let mut file_sizes = Vec::new();
        let mut post_names = Vec::new();
        let mut post_fields: HashMap<String, Vec<String>> = HashMap::new();

        if skip_preamble(&mut reader, &delimiter)? {
            loop {
                let Some(headers) = read_part_headers(&mut reader)? else {
                    break;
                };
                // A part whose disposition cannot be parsed is tolerated: no
                // filename, empty form name.
                let disposition = headers
                    .get("content-disposition")
                    .and_then(|v| parse_media_type(v).ok());
                let (form_name, filename) = match disposition {
                    Some((_, params)) => (
                        params.get("name").cloned().unwrap_or_default(),
                        params.get("filename").cloned().filter(|f| !f.is_empty()),
                    ),
                    None => (String::new(), None),
                };

                let finished = if let Some(filename) = filename {
                    let mut spool = tempfile::Builder::new()
                        .prefix(SPOOL_PREFIX)
                        .tempfile_in(&options.storage_path)?;
                    let (size, finished) = copy_part(&mut reader, &delimiter, spool.as_file_mut())?;
                    let (_, path) = spool.keep().map_err(|e| Error::Io(e.error))?;
                    total_size += size;
                    file_names.push(filename);
                    file_tmp_names.push(path.to_string_lossy().into_owned());
                    file_sizes.push(size.to_string());
                    file_arg_names.push(form_name);
                    finished
                } else {
                    let mut data = Vec::new();
                    let (size, finished) = copy_part(&mut reader, &delimiter, &mut data)?;
                    total_size += size;
                    post_names.push(form_name.clone());
                    post_fields
                        .entry(form_name)
                        .or_default()
                        .push(String::from_utf8_lossy(&data).into_owned());
                    finished
                };
                if finished {
                    break;
                }
            }
        }

        let mut post_name_map: HashMap<String, Vec<String>> = HashMap::new();
        for name in &post_names {
            post_name_map.insert(name.clone(), vec![name.clone()]);
        }

        let keyless = |values: Vec<String>| HashMap::from([(String::new(), values)]);
        let mut collections = CollectionsMap::new();
        collections.insert(RuleVariable::FilesNames, keyless(file_arg_names));
        collections.insert(RuleVariable::FilesTmpNames, keyless(file_tmp_names));
        collections.insert(RuleVariable::Files, keyless(file_names));
        collections.insert(RuleVariable::FilesSizes, keyless(file_sizes));
        collections.insert(
            RuleVariable::FilesCombinedSize,
            keyless(vec![total_size.to_string()]),
        );
        collections.insert(RuleVariable::ArgsPostNames, post_name_map);
        collections.insert(RuleVariable::ArgsPost, post_fields.clone());
        collections.insert(RuleVariable::Args, post_fields);
        self.collections = collections;
        Ok(())
    }

    fn collections(&self) -> &CollectionsMap {
        &self.collections
    }

    // Selection over multipart content is not supported; every expression
    // yields the empty selection.
    fn find(&self, _expr: &str) -> Result<HashMap<String, Vec<String>>> {
        Ok(HashMap::new())
    }

    fn variable_hook(&self) -> RuleVariable {
        RuleVariable::Files
    }
}

/// Consume the preamble up to the first delimiter line. Returns false when
/// the stream ends (or closes) before any part starts.
fn skip_preamble(reader: &mut impl BufRead, delimiter: &[u8]) -> Result<bool> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        match as_delimiter(&line, delimiter) {
            Some(false) => return Ok(true),
            Some(true) => return Ok(false),
            None => {}
        }
    }
}

/// Read a part's headers up to the blank separator line.
///
/// Header names are lowercased; lines without a colon are ignored. Returns
/// `None` on a truncated stream.
fn read_part_headers(reader: &mut impl BufRead) -> Result<Option<HashMap<String, String>>> {
    let mut headers = HashMap::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        strip_line_ending(&mut line);
        if line.is_empty() {
            return Ok(Some(headers));
        }
        let text = String::from_utf8_lossy(&line);
        if let Some((name, value)) = text.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
}

/// Copy a part's content into `sink` until the next delimiter line.
///
/// The CRLF preceding the delimiter belongs to the framing, not the content.
/// Returns the copied byte count and whether the closing delimiter was seen.
/// A stream that ends without a delimiter terminates the part.
fn copy_part(
    reader: &mut impl BufRead,
    delimiter: &[u8],
    sink: &mut impl Write,
) -> Result<(u64, bool)> {
    let mut size: u64 = 0;
    let mut pending: Option<Vec<u8>> = None;
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            if let Some(last) = pending.take() {
                sink.write_all(&last)?;
                size += last.len() as u64;
            }
            return Ok((size, true));
        }
        if let Some(finished) = as_delimiter(&line, delimiter) {
            if let Some(mut last) = pending.take() {
                strip_line_ending(&mut last);
                sink.write_all(&last)?;
                size += last.len() as u64;
            }
            return Ok((size, finished));
        }
        if let Some(previous) = pending.take() {
            sink.write_all(&previous)?;
            size += previous.len() as u64;
        }
        pending = Some(line.clone());
    }
}

/// Classify a raw line as a part delimiter (`Some(false)`), the closing
/// delimiter (`Some(true)`), or content (`None`). Trailing whitespace after
/// the delimiter is tolerated.
fn as_delimiter(line: &[u8], delimiter: &[u8]) -> Option<bool> {
    let mut text = line;
    while let Some((&last, rest)) = text.split_last() {
        if matches!(last, b'\n' | b'\r' | b' ' | b'\t') {
            text = rest;
        } else {
            break;
        }
    }
    if !text.starts_with(delimiter) {
        return None;
    }
    match &text[delimiter.len()..] {
        [] => Some(false),
        b"--" => Some(true),
        _ => None,
    }
}

fn strip_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
