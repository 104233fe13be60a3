//! Integration tests for exportbench

use exportbench::bench::{BenchConfig, Benchmark, MemoryStats, MetricsProvider, Suite};
use exportbench::dataset::generate_applicants;
use exportbench::delimited::{
    export_csv_buffered, export_csv_library, export_csv_unbuffered, AppendMode,
};
use exportbench::xlsx::{export_xlsx_stream, WorkbookReader, DEFAULT_SHEET_NAME};
use exportbench::{Applicant, HEADERS};
use quick_xml::events::Event;
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::tempdir;

struct NoMetrics;

impl MetricsProvider for NoMetrics {
    fn collect(&mut self) {}

    fn snapshot(&mut self) -> MemoryStats {
        MemoryStats::default()
    }
}

fn parse_csv(path: &Path) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn read_xlsx(path: &Path) -> Vec<Vec<String>> {
    WorkbookReader::open(path)
        .unwrap()
        .rows(DEFAULT_SHEET_NAME)
        .unwrap()
        .iter()
        .map(|r| r.values())
        .collect()
}

/// Raw worksheet XML, read with the `zip` crate
fn sheet_xml(path: &Path) -> String {
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut xml = String::new();
    archive
        .by_name("xl/worksheets/sheet1.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

/// (cell reference, text) for every inline string, parsed with quick-xml
fn parse_inline_strings(xml: &str) -> Vec<(String, String)> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut cells = Vec::new();
    let mut cell_ref = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"c" => {
                cell_ref = e
                    .try_get_attribute("r")
                    .unwrap()
                    .unwrap()
                    .unescape_value()
                    .unwrap()
                    .into_owned();
            }
            Event::Start(e) if e.name().as_ref() == b"t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"t" => in_text = false,
            Event::Text(t) if in_text => {
                cells.push((cell_ref.clone(), t.unescape().unwrap().into_owned()));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    cells
}

fn tricky_applicants() -> Vec<Applicant> {
    let mut data = generate_applicants(4);
    data[0].past_company = "Acme, \"Global\" Ltd".to_string();
    data[1].current_location = "Line one\nLine two".to_string();
    data[2].portfolio_link = "a\r\nb".to_string();
    data[3].campus = " <Tech> & Arts ".to_string();
    data
}

#[test]
fn test_three_records_match_across_formats() {
    let dir = tempdir().unwrap();
    let data = generate_applicants(3);

    let library = dir.path().join("library.csv");
    let unbuffered = dir.path().join("unbuffered.csv");
    let buffered = dir.path().join("buffered.csv");
    let workbook = dir.path().join("out.xlsx");

    export_csv_library(&library, &data).unwrap();
    export_csv_unbuffered(&unbuffered, &data, AppendMode::PerRow).unwrap();
    export_csv_buffered(&buffered, &data, 64 * 1024).unwrap();
    export_xlsx_stream(&workbook, &data).unwrap();

    let expected: Vec<Vec<String>> = std::iter::once(HEADERS.map(str::to_string).to_vec())
        .chain(
            data.iter()
                .map(|a| a.fields().iter().map(|f| f.to_string()).collect()),
        )
        .collect();

    assert_eq!(parse_csv(&library), expected);
    assert_eq!(parse_csv(&unbuffered), expected);
    assert_eq!(parse_csv(&buffered), expected);
    assert_eq!(read_xlsx(&workbook), expected);
}

#[test]
fn test_unbuffered_and_buffered_are_byte_identical() {
    let dir = tempdir().unwrap();
    let data = tricky_applicants();

    let per_row = dir.path().join("per_row.csv");
    let per_call = dir.path().join("per_call.csv");
    let buffered = dir.path().join("buffered.csv");
    let library = dir.path().join("library.csv");

    export_csv_unbuffered(&per_row, &data, AppendMode::PerRow).unwrap();
    export_csv_unbuffered(&per_call, &data, AppendMode::PerCall).unwrap();
    export_csv_buffered(&buffered, &data, 64 * 1024).unwrap();
    export_csv_library(&library, &data).unwrap();

    let reference = fs::read(&per_row).unwrap();
    assert_eq!(fs::read(&per_call).unwrap(), reference);
    assert_eq!(fs::read(&buffered).unwrap(), reference);
    assert_eq!(fs::read(&library).unwrap(), reference);

    // one terminator per row, no trailing blank line
    assert!(reference.ends_with(b"\n"));
    assert!(!reference.ends_with(b"\n\n"));

    let rows = parse_csv(&per_row);
    assert_eq!(rows.len(), data.len() + 1);
    assert_eq!(rows[1][6], "Acme, \"Global\" Ltd");
    assert_eq!(rows[2][9], "Line one\nLine two");
    assert_eq!(rows[3][11], "a\r\nb");
}

#[test]
fn test_tiny_buffers_match_reference() {
    let dir = tempdir().unwrap();
    let data = tricky_applicants();

    let reference_path = dir.path().join("reference.csv");
    export_csv_unbuffered(&reference_path, &data, AppendMode::PerRow).unwrap();
    let reference = fs::read(&reference_path).unwrap();

    for size in [1, 2, 5, 17, 100, 333, 4096] {
        let path = dir.path().join(format!("buffered_{}.csv", size));
        export_csv_buffered(&path, &data, size).unwrap();
        assert_eq!(fs::read(&path).unwrap(), reference, "buffer size {}", size);
    }
}

#[test]
fn test_xlsx_rows_and_styles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("styled.xlsx");
    let data = tricky_applicants();

    export_xlsx_stream(&path, &data).unwrap();

    let mut reader = WorkbookReader::open(&path).unwrap();
    assert_eq!(reader.sheet_names().unwrap(), vec![DEFAULT_SHEET_NAME]);

    let rows = reader.rows(DEFAULT_SHEET_NAME).unwrap();
    assert_eq!(rows.len(), data.len() + 1);
    assert_eq!(rows[0].index, 1);
    assert_eq!(rows[0].values(), HEADERS);
    for (k, applicant) in data.iter().enumerate() {
        assert_eq!(rows[k + 1].index as usize, k + 2);
        assert_eq!(rows[k + 1].values(), applicant.fields());
    }

    let formats = reader.cell_formats().unwrap();
    for cell in &rows[0].cells {
        let format = &formats[cell.style as usize];
        assert!(format.bold);
        assert_eq!(format.font_color.as_deref(), Some("FFFFFFFF"));
        assert_eq!(format.fill_pattern.as_deref(), Some("solid"));
        assert_eq!(format.fill_color.as_deref(), Some("FF800080"));
    }
    for row in &rows[1..] {
        for cell in &row.cells {
            let format = &formats[cell.style as usize];
            assert!(!format.bold);
            assert_ne!(format.fill_pattern.as_deref(), Some("solid"));
        }
    }
}

#[test]
fn test_xlsx_sheet_is_well_formed_with_control_characters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("control.xlsx");
    let mut data = generate_applicants(1);
    data[0].portfolio_link = "a\r\nb".to_string();
    data[0].campus = "bell\u{7}here".to_string();

    export_xlsx_stream(&path, &data).unwrap();

    // XML 1.0 Char production; a raw CR would be folded into LF by any parser
    let xml = sheet_xml(&path);
    let bad = xml.chars().find(|&c| {
        !matches!(
            c,
            '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
        )
    });
    assert_eq!(bad, None);

    let cells = parse_inline_strings(&xml);
    assert_eq!(cells.len(), 2 * HEADERS.len());
    let text_of = |cell: &str| {
        cells
            .iter()
            .find(|(r, _)| r == cell)
            .map(|(_, t)| t.as_str())
            .unwrap()
    };
    assert_eq!(text_of("L2"), "a\r\nb");
    assert_eq!(text_of("H2"), "bell\u{FFFD}here");
    assert_eq!(text_of("A2"), data[0].name);

    let rows = read_xlsx(&path);
    assert_eq!(rows[1][11], "a\r\nb");
    assert_eq!(rows[1][7], "bell\u{FFFD}here");
}

#[test]
fn test_xlsx_tricky_values_parse_as_xml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tricky.xlsx");
    let data = tricky_applicants();

    export_xlsx_stream(&path, &data).unwrap();

    let cells = parse_inline_strings(&sheet_xml(&path));
    let values: Vec<&str> = cells.iter().map(|(_, t)| t.as_str()).collect();
    let expected: Vec<&str> = HEADERS
        .iter()
        .copied()
        .chain(data.iter().flat_map(|a| a.fields()))
        .collect();
    assert_eq!(values, expected);
}

#[test]
fn test_large_xlsx_streams_past_flush_interval() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.xlsx");
    let data = generate_applicants(2_500);

    export_xlsx_stream(&path, &data).unwrap();

    let rows = read_xlsx(&path);
    assert_eq!(rows.len(), 2_501);
    assert_eq!(rows[2_500], data[2_499].fields());
}

#[test]
fn test_suite_reports_unwritable_destination_and_continues() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does_not_exist");
    let config = BenchConfig::default()
        .with_record_count(10)
        .with_output_dir(&missing);
    let data = generate_applicants(config.record_count);

    let mut out = Vec::new();
    let mut bench = Benchmark::new(NoMetrics);
    let outcomes = Suite::standard(&config)
        .run(&mut bench, &data, &mut out)
        .unwrap();

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| !o.is_completed()));

    let console = String::from_utf8(out).unwrap();
    for label in [
        "Export to CSV",
        "Export to CSV (Unbuffered)",
        "Export to CSV (Stream)",
        "Export to Excel (Stream + Style)",
    ] {
        assert!(console.contains(&format!("[{}] Error:", label)), "{}", label);
    }
    assert!(!missing.exists());
}

#[test]
fn test_standard_suite_writes_every_file() {
    let dir = tempdir().unwrap();
    let config = BenchConfig::default()
        .with_record_count(50)
        .with_output_dir(dir.path())
        .with_buffer_size(7)
        .with_flush_interval(3)
        .with_compression_level(0);
    let data = generate_applicants(config.record_count);

    let mut out = Vec::new();
    let mut bench = Benchmark::new(NoMetrics);
    let outcomes = Suite::standard(&config)
        .run(&mut bench, &data, &mut out)
        .unwrap();

    assert!(outcomes.iter().all(|o| o.is_completed()));
    for outcome in &outcomes {
        let report = outcome.report().unwrap();
        assert!(report.file_size.as_ref().unwrap() > &0);
    }

    let library = fs::read(config.output_path("benchmark_output.csv")).unwrap();
    let stream = fs::read(config.output_path("benchmark_output_stream.csv")).unwrap();
    assert_eq!(library, stream);
    assert_eq!(read_xlsx(&config.output_path("benchmark_output.xlsx")).len(), 51);
}
