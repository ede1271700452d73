//! XML parsing utilities shared by the OOXML (.xlsx, .docx) and OpenDocument (.ods) readers
//! Provides XML reader wrapper and helper traits for attribute and text processing

use crate::error::RustyQuizError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub(crate) enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper with a fixed configuration for office document parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader for spreadsheet parsing, expanding `<a/>` into start and end events
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        Self::with_expansion(buf_reader, true)
    }

    /// Creates a new XML reader that reports `<a/>` as a single empty event.
    /// Byte positions stay aligned with the source text, which the document writer relies on.
    pub(crate) fn raw(buf_reader: R) -> XmlReader<R> {
        Self::with_expansion(buf_reader, false)
    }

    fn with_expansion(buf_reader: R, expand_empty_elements: bool) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = expand_empty_elements;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Byte offset just after the last event returned by `next`
    pub(crate) fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    /// Reads the next XML event together with the byte range it occupies in the source
    pub(crate) fn next_with_range(&'_ mut self) -> Result<Option<(Range<usize>, Event<'_>)>, RustyQuizError> {
        let start = self.position();
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some((start..self.reader.buffer_position() as usize, event))),
            Err(error) => Err(RustyQuizError::XmlError(error)),
        }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, RustyQuizError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(RustyQuizError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing convenient value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, RustyQuizError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, RustyQuizError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, RustyQuizError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, RustyQuizError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => RustyQuizError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => RustyQuizError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyQuizError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyQuizError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, RustyQuizError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, RustyQuizError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyQuizError>;

    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyQuizError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), RustyQuizError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), RustyQuizError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_with_entities() -> Result<(), RustyQuizError> {
        let mut reader = XmlReader::new("<t>Fish &amp; Chips &#65;&#x42;</t>".as_bytes());
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "Fish & Chips AB");
        Ok(())
    }

    #[test]
    fn test_raw_reader_keeps_empty_elements() {
        let mut reader = XmlReader::raw("<a><b/></a>".as_bytes());
        let mut empty = 0;
        let mut positions = Vec::new();
        while let Some(event) = reader.next().unwrap() {
            if let Event::Empty(_) = event {
                empty += 1;
            }
            positions.push(reader.position());
        }
        assert_eq!(empty, 1);
        assert_eq!(positions, vec![3, 7, 11]);
    }

    #[test]
    fn test_event_ranges_cover_source() -> Result<(), RustyQuizError> {
        let source = "<a> x <b/></a>";
        let mut reader = XmlReader::raw(source.as_bytes());
        let mut pieces = Vec::new();
        while let Some((range, _)) = reader.next_with_range()? {
            pieces.push(&source[range]);
        }
        assert_eq!(pieces, vec!["<a>", " x ", "<b/>", "</a>"]);
        Ok(())
    }
}
