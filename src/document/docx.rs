use crate::document::Cell;
use crate::document::CellLayout;
use crate::document::DocumentError;
use crate::document::Table;
use crate::error::RustyQuizError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use log::debug;
use quick_xml::escape::partial_escape;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Cursor;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

const DOCUMENT_PART: &str = "word/document.xml";

// WordprocessingML elements that make up the table model
const TAG_TABLE: QName = QName(b"w:tbl");
const TAG_ROW: QName = QName(b"w:tr");
const TAG_CELL: QName = QName(b"w:tc");
const TAG_CELL_PROPERTIES: QName = QName(b"w:tcPr");
const TAG_GRID_SPAN: QName = QName(b"w:gridSpan");
const TAG_VERTICAL_MERGE: QName = QName(b"w:vMerge");
const TAG_PARAGRAPH: QName = QName(b"w:p");
const TAG_PARAGRAPH_PROPERTIES: QName = QName(b"w:pPr");
const TAG_RUN: QName = QName(b"w:r");
const TAG_RUN_PROPERTIES: QName = QName(b"w:rPr");
const TAG_TEXT: QName = QName(b"w:t");
const TAG_TAB: QName = QName(b"w:tab");
const TAG_BREAK: QName = QName(b"w:br");
const TAG_CARRIAGE_RETURN: QName = QName(b"w:cr");
const TAG_TEXT_BOX: QName = QName(b"w:txbxContent");

/// A `.docx` package opened for table editing
pub(crate) struct Docx {
    pub(crate) name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Actual entry name of the main document part
    part_name: String,
    /// Source bytes of the main document part
    xml: Vec<u8>,
    pub(crate) tables: Vec<Table>,
}

impl Docx {
    /// Opens a Word document from a local path or remote URL and loads its top-level tables
    pub(crate) fn open(file_name: &str) -> Result<Docx, RustyQuizError> {
        let mut reader = UnifiedReader::new(file_name)?;
        if reader.is_compound_file()? {
            Err(DocumentError::DocumentPasswordProtectedError(file_name.to_owned()))?
        }
        let mut zip = ZipArchive::new(reader)
            .map_err(|_| DocumentError::UnsupportedFormatError(file_name.to_owned()))?;
        let part_name = zip
            .file(DOCUMENT_PART)?
            .map(|file| file.name().to_owned())
            .ok_or_else(|| DocumentError::MissingPartError(file_name.to_owned(), DOCUMENT_PART.to_owned()))?;
        let xml = zip
            .read_bytes(&part_name)?
            .ok_or_else(|| DocumentError::MissingPartError(file_name.to_owned(), DOCUMENT_PART.to_owned()))?;
        let tables = load_tables(&xml)?;
        debug!("Loaded {} tables from '{}'", tables.len(), file_name);
        Ok(Docx {
            name: file_name.to_owned(),
            zip,
            part_name,
            xml,
            tables,
        })
    }

    /// Main document part with every changed cell rewritten
    pub(crate) fn document_xml(&self) -> Vec<u8> {
        render_document(&self.xml, &self.tables)
    }

    /// Serializes the package, copying every part except the main document unchanged
    pub(crate) fn to_bytes(&mut self) -> Result<Vec<u8>, RustyQuizError> {
        let xml = self.document_xml();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for index in 0..self.zip.len() {
            let is_document = self.zip.by_index_raw(index)?.name() == self.part_name;
            if is_document {
                writer.start_file(self.part_name.as_str(), options)?;
                writer.write_all(&xml)?;
            } else {
                writer.raw_copy_file(self.zip.by_index_raw(index)?)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Writes the package to `path`
    pub(crate) fn save(&mut self, path: &Path) -> Result<(), RustyQuizError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Cell being read, with the paragraphs collected so far
struct CellBuilder {
    paragraphs: Vec<String>,
    layout: CellLayout,
    /// Grid columns covered by the cell
    grid_span: usize,
    /// `w:vMerge` without `restart`: the cell continues the one above
    continuation: bool,
    in_properties: bool,
    in_paragraph: bool,
    in_run: bool,
    in_text: bool,
    properties_start: Option<usize>,
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            layout: CellLayout::default(),
            grid_span: 1,
            continuation: false,
            in_properties: false,
            in_paragraph: false,
            in_run: false,
            in_text: false,
            properties_start: None,
        }
    }
}

impl CellBuilder {
    fn push_char(&mut self, character: char) {
        if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.push(character);
        }
    }

    /// Adds the cell to the last row of the last table
    fn finish(self, tables: &mut [Table]) {
        let Some(table) = tables.last_mut() else {
            return;
        };
        let (span, continuation) = (self.grid_span, self.continuation);
        let mut cell = Cell::new(self.paragraphs.join("\n"));
        cell.layout = self.layout;
        if continuation {
            table.push_continuation(cell, span);
        } else {
            table.push_cell(cell, span);
        }
    }
}

/// Parses the top-level tables of a `word/document.xml` part.
///
/// Rows are expanded onto the table grid following `w:gridSpan` and `w:vMerge`.
/// Tables nested in cells and text boxes are not part of the model, and their text
/// does not count towards the enclosing cell.
pub(crate) fn load_tables(xml: &[u8]) -> Result<Vec<Table>, RustyQuizError> {
    let mut reader = XmlReader::raw(xml);
    let mut tables = Vec::<Table>::new();
    let mut table_depth = 0usize;
    let mut text_box_depth = 0usize;
    let mut cell: Option<CellBuilder> = None;

    while let Some((range, event)) = reader.next_with_range()? {
        match event {
            Event::Start(event) if event.name() == TAG_TABLE => {
                table_depth += 1;
                if table_depth == 1 {
                    tables.push(Table::default());
                }
            }
            Event::End(event) if event.name() == TAG_TABLE => {
                table_depth = table_depth.saturating_sub(1);
            }
            Event::Start(event) if event.name() == TAG_TEXT_BOX => text_box_depth += 1,
            Event::End(event) if event.name() == TAG_TEXT_BOX => {
                text_box_depth = text_box_depth.saturating_sub(1);
            }
            _ if table_depth != 1 || text_box_depth > 0 => (),

            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(table) = tables.last_mut() {
                    table.push_row();
                }
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                let mut builder = CellBuilder::default();
                builder.layout.content = range.end..range.end;
                cell = Some(builder);
            }
            Event::Empty(event) if event.name() == TAG_CELL => {
                let mut builder = CellBuilder::default();
                builder.layout.content = range;
                builder.layout.self_closing = true;
                builder.finish(&mut tables);
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(mut builder) = cell.take() {
                    builder.layout.content.end = range.start;
                    builder.finish(&mut tables);
                }
            }
            event => {
                if let Some(builder) = cell.as_mut() {
                    read_cell_content(builder, range, event)?;
                }
            }
        }
    }
    Ok(tables)
}

/// Handles an event inside a top-level cell
fn read_cell_content(builder: &mut CellBuilder, range: Range<usize>, event: Event) -> Result<(), RustyQuizError> {
    match event {
        Event::Start(event) if event.name() == TAG_CELL_PROPERTIES => builder.in_properties = true,
        Event::End(event) if event.name() == TAG_CELL_PROPERTIES => {
            builder.in_properties = false;
            builder.layout.content.start = range.end;
        }
        Event::Empty(event) if event.name() == TAG_CELL_PROPERTIES => builder.layout.content.start = range.end,
        Event::Start(event) | Event::Empty(event) if builder.in_properties && event.name() == TAG_GRID_SPAN => {
            builder.grid_span = event.parse_attribute_value::<usize>("w:val")?.unwrap_or(1).max(1);
        }
        Event::Start(event) | Event::Empty(event) if builder.in_properties && event.name() == TAG_VERTICAL_MERGE => {
            builder.continuation = event.get_attribute_value("w:val")?.is_none_or(|value| value == "continue");
        }

        Event::Start(event) if event.name() == TAG_PARAGRAPH => {
            builder.paragraphs.push(String::new());
            builder.in_paragraph = true;
        }
        Event::Empty(event) if event.name() == TAG_PARAGRAPH => builder.paragraphs.push(String::new()),
        Event::End(event) if event.name() == TAG_PARAGRAPH => builder.in_paragraph = false,

        // Formatting is taken from the first paragraph and the first run of the cell
        Event::Start(event) if event.name() == TAG_PARAGRAPH_PROPERTIES => {
            if builder.in_paragraph && builder.paragraphs.len() == 1 && builder.layout.paragraph_properties.is_none() {
                builder.properties_start = Some(range.start);
            }
        }
        Event::End(event) if event.name() == TAG_PARAGRAPH_PROPERTIES => {
            if let Some(start) = builder.properties_start.take() {
                builder.layout.paragraph_properties = Some(start..range.end);
            }
        }
        Event::Empty(event) if event.name() == TAG_PARAGRAPH_PROPERTIES => {
            if builder.in_paragraph && builder.paragraphs.len() == 1 && builder.layout.paragraph_properties.is_none() {
                builder.layout.paragraph_properties = Some(range);
            }
        }
        Event::Start(event) if builder.in_paragraph && event.name() == TAG_RUN => builder.in_run = true,
        Event::End(event) if event.name() == TAG_RUN => builder.in_run = false,
        Event::Start(event) if builder.in_run && event.name() == TAG_RUN_PROPERTIES => {
            if builder.layout.run_properties.is_none() {
                builder.properties_start = Some(range.start);
            }
        }
        Event::End(event) if builder.in_run && event.name() == TAG_RUN_PROPERTIES => {
            if let Some(start) = builder.properties_start.take() {
                builder.layout.run_properties = Some(start..range.end);
            }
        }
        Event::Empty(event) if builder.in_run && event.name() == TAG_RUN_PROPERTIES => {
            if builder.layout.run_properties.is_none() {
                builder.layout.run_properties = Some(range);
            }
        }

        Event::Start(event) if builder.in_run && event.name() == TAG_TEXT => builder.in_text = true,
        Event::End(event) if event.name() == TAG_TEXT => builder.in_text = false,
        Event::Start(event) | Event::Empty(event) if builder.in_run && event.name() == TAG_TAB => builder.push_char('\t'),
        Event::Start(event) | Event::Empty(event) if builder.in_run && (event.name() == TAG_BREAK || event.name() == TAG_CARRIAGE_RETURN) => {
            builder.push_char('\n')
        }
        Event::Text(event) if builder.in_text => {
            if let Some(paragraph) = builder.paragraphs.last_mut() {
                paragraph.push_bytes_text(&event)?;
            }
        }
        Event::GeneralRef(event) if builder.in_text => {
            if let Some(paragraph) = builder.paragraphs.last_mut() {
                paragraph.push_bytes_ref(&event)?;
            }
        }
        _ => (),
    }
    Ok(())
}

/// Splices the XML of every changed cell into the source document
fn render_document(source: &[u8], tables: &[Table]) -> Vec<u8> {
    let mut changed: Vec<&Cell> = tables
        .iter()
        .flat_map(|table| table.cells())
        .filter(|cell| cell.is_changed())
        .collect();
    changed.sort_by_key(|cell| cell.layout.content.start);

    let mut xml = Vec::with_capacity(source.len());
    let mut position = 0usize;
    for cell in changed {
        let content = &cell.layout.content;
        if content.start < position || content.end > source.len() {
            continue;
        }
        xml.extend_from_slice(&source[position..content.start]);
        write_cell(&mut xml, source, cell);
        position = content.end;
    }
    xml.extend_from_slice(&source[position..]);
    xml
}

/// Writes the replacement content of a cell: one paragraph holding one run
fn write_cell(xml: &mut Vec<u8>, source: &[u8], cell: &Cell) {
    let layout = &cell.layout;
    if layout.self_closing {
        xml.extend_from_slice(b"<w:tc>");
    }
    xml.extend_from_slice(b"<w:p>");
    if let Some(range) = &layout.paragraph_properties {
        xml.extend_from_slice(&source[range.clone()]);
    }
    xml.extend_from_slice(b"<w:r>");
    if let Some(range) = &layout.run_properties {
        xml.extend_from_slice(&source[range.clone()]);
    }
    write_runs(xml, cell.text());
    xml.extend_from_slice(b"</w:r></w:p>");
    if layout.self_closing {
        xml.extend_from_slice(b"</w:tc>");
    }
}

fn write_runs(xml: &mut Vec<u8>, text: &str) {
    let mut pieces = text.split_inclusive(['\n', '\t']).peekable();
    while let Some(piece) = pieces.next() {
        let (content, separator) = match piece.char_indices().last() {
            Some((index, separator @ ('\n' | '\t'))) => (&piece[..index], Some(separator)),
            _ => (piece, None),
        };
        let content: String = content
            .strip_suffix('\r')
            .unwrap_or(content)
            .chars()
            .filter(|character| is_xml_char(*character))
            .collect();
        if !content.is_empty() {
            xml.extend_from_slice(b"<w:t xml:space=\"preserve\">");
            xml.extend_from_slice(partial_escape(&content).as_bytes());
            xml.extend_from_slice(b"</w:t>");
        }
        match separator {
            Some('\n') => xml.extend_from_slice(b"<w:br/>"),
            Some(_) => xml.extend_from_slice(b"<w:tab/>"),
            None => (),
        }
    }
}

/// Control characters other than tab, line feed and carriage return are not allowed in XML 1.0
fn is_xml_char(character: char) -> bool {
    !matches!(character, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}
