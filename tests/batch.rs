//! File-level conversion: input discovery, memory-mapped files, compiled schemas.

use std::fs;
use std::path::PathBuf;

use asn1_csv::batch::{
    convert_all, convert_file, expand_inputs, load_compiled_schema, output_path_for, parse_ext_list,
    save_compiled_schema,
};
use asn1_csv::writer::LINE_SEPARATOR;
use asn1_csv::{ParserOptions, Schema};
use tempfile::tempdir;

// [79] { [0] n, [1] { SEQUENCE { [1] 10 }, SEQUENCE { [1] 20 } } }
fn record(n: u8) -> Vec<u8> {
    let mut v = vec![0xBF, 0x4F, 0x0F, 0x80, 0x01, n];
    v.extend(hex::decode("A10A300381010A3003810114").unwrap());
    v
}

fn schema() -> Schema {
    Schema::new("REC_NO,79.0,79.1.*.1", "INTEGER,INTEGER,INTEGER").unwrap()
}

fn expected(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("{}{}", l, LINE_SEPARATOR)).collect()
}

#[test]
fn converts_one_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("cdr.ber");
    let output = dir.path().join("cdr.csv");
    fs::write(&input, [record(5), record(6)].concat()).unwrap();

    let rows = convert_file(&schema(), ParserOptions::default(), &input, &output, 4096).unwrap();
    assert_eq!(rows, 4);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        expected(&["1,5,10", "2,5,20", "3,6,10", "4,6,20"])
    );
}

#[test]
fn empty_file_gives_empty_csv() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("empty.ber");
    let output = dir.path().join("empty.csv");
    fs::write(&input, b"").unwrap();

    let rows = convert_file(&schema(), ParserOptions::default(), &input, &output, 4096).unwrap();
    assert_eq!(rows, 0);
    assert_eq!(fs::read(&output).unwrap(), Vec::<u8>::new());
}

#[test]
fn failed_conversion_leaves_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.ber");
    let output = dir.path().join("broken.csv");
    let mut data = record(1);
    data.extend([0x61, 0x00]); // APPLICATION class
    fs::write(&input, data).unwrap();

    let err = convert_file(&schema(), ParserOptions::default(), &input, &output, 16).unwrap_err();
    assert!(format!("{:#}", err).contains("APPLICATION"));
    assert!(!output.exists());
}

#[test]
fn unreadable_input_creates_no_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");

    // a directory is not a regular file
    let as_input = dir.path().join("not_a_file");
    fs::create_dir_all(&as_input).unwrap();
    assert!(convert_file(&schema(), ParserOptions::default(), &as_input, &output, 64).is_err());
    assert!(!output.exists());

    let missing = dir.path().join("missing.ber");
    assert!(convert_file(&schema(), ParserOptions::default(), &missing, &output, 64).is_err());
    assert!(!output.exists());
}

#[test]
fn same_file_name_in_two_directories_is_rejected() {
    let dir = tempdir().unwrap();
    let in_dir = dir.path().join("in");
    let out_dir = dir.path().join("out");
    fs::create_dir_all(in_dir.join("a")).unwrap();
    fs::create_dir_all(in_dir.join("b")).unwrap();
    fs::create_dir_all(&out_dir).unwrap();

    let mut broken = record(2);
    broken.extend([0x61, 0x00]);
    fs::write(in_dir.join("a").join("cdr.ber"), record(1)).unwrap();
    fs::write(in_dir.join("b").join("cdr.ber"), broken).unwrap();
    fs::write(in_dir.join("other.ber"), record(3)).unwrap();

    let files = expand_inputs(&[in_dir.clone()], None).unwrap();
    let results = convert_all(&schema(), ParserOptions::default(), &files, &out_dir, 1024);
    assert_eq!(results.len(), 3);

    for (path, res) in &results {
        if path.file_name().unwrap() == "cdr.ber" {
            let err = res.as_ref().unwrap_err();
            assert!(format!("{:#}", err).contains("shared by 2 inputs"));
        } else {
            assert_eq!(*res.as_ref().unwrap(), 2);
        }
    }
    assert!(!out_dir.join("cdr.ber.csv").exists());
    assert!(out_dir.join("other.ber.csv").exists());
}

#[test]
fn expands_directories_with_extension_filter() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    fs::write(dir.path().join("z.BER"), record(1)).unwrap();
    fs::write(nested.join("x.ber"), record(2)).unwrap();
    fs::write(nested.join("notes.txt"), "skip").unwrap();

    let exts = parse_ext_list(" .ber ,dat,");
    assert_eq!(exts.len(), 2);

    let files = expand_inputs(&[dir.path().to_path_buf()], Some(&exts)).unwrap();
    assert_eq!(files, vec![nested.join("x.ber"), dir.path().join("z.BER")]);

    let all = expand_inputs(&[dir.path().to_path_buf(), nested.join("x.ber")], None).unwrap();
    assert_eq!(all.len(), 3);

    assert!(expand_inputs(&[PathBuf::from("/definitely/not/here")], None).is_err());
}

#[test]
fn converts_a_directory_in_parallel() {
    let dir = tempdir().unwrap();
    let in_dir = dir.path().join("in");
    let out_dir = dir.path().join("out");
    fs::create_dir_all(&in_dir).unwrap();
    fs::create_dir_all(&out_dir).unwrap();
    for i in 0..6u8 {
        fs::write(in_dir.join(format!("f{}.ber", i)), record(i).repeat(i as usize + 1)).unwrap();
    }
    fs::write(in_dir.join("bad.ber"), [0xE0u8, 0x00]).unwrap();

    let files = expand_inputs(&[in_dir.clone()], None).unwrap();
    let results = convert_all(&schema(), ParserOptions::default(), &files, &out_dir, 1024);
    assert_eq!(results.len(), 7);

    for (path, res) in &results {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if name == "bad.ber" {
            assert!(res.is_err());
            assert!(!out_dir.join("bad.ber.csv").exists());
            continue;
        }
        let i: usize = name[1..2].parse().unwrap();
        assert_eq!(*res.as_ref().unwrap(), 2 * (i as u64 + 1));
        let text = fs::read_to_string(out_dir.join(format!("{}.csv", name))).unwrap();
        // REC_NO restarts for every file
        assert!(text.starts_with(&format!("1,{},10{}", i, LINE_SEPARATOR)));
    }
}

#[test]
fn output_name_appends_csv() {
    let out = output_path_for(&PathBuf::from("/data/in/cdr_01.dat"), &PathBuf::from("/data/out")).unwrap();
    assert_eq!(out, PathBuf::from("/data/out/cdr_01.dat.csv"));
}

#[test]
fn compiled_schema_round_trip() {
    let dir = tempdir().unwrap();
    let compiled = dir.path().join("schema.bin");
    let parsed = Schema::new("REC_NO,79.0,79.1.*.1[1]", "INTEGER,TBCD_STRING,INTEGER").unwrap();
    save_compiled_schema(&parsed, &compiled).unwrap();
    let loaded = load_compiled_schema(&compiled).unwrap();

    assert_eq!(loaded.column_count(), 3);
    assert!(loaded.has_header("79.1.*.1"));
    assert_eq!(loaded.headers()[2].explicit_source_row, Some(1));

    let input = dir.path().join("in.ber");
    fs::write(&input, record(0x21)).unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    convert_file(&parsed, ParserOptions::default(), &input, &a, 64).unwrap();
    convert_file(&loaded, ParserOptions::default(), &input, &b, 64).unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    assert_eq!(fs::read_to_string(&b).unwrap(), expected(&["1,12,20", "2,12,20"]));

    fs::write(&compiled, b"not a schema").unwrap();
    assert!(load_compiled_schema(&compiled).is_err());
}
