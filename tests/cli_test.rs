use clap::Parser;
use jtple::cli::Args;
use std::ffi::OsString;
use std::path::PathBuf;

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("jtple")];
    res.extend(args.iter().map(OsString::from));
    res
}

#[test]
fn test_basic_args() {
    let args = make_args(&["./index.html"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert_eq!(parsed.document, PathBuf::from("./index.html"));
    assert_eq!(parsed.template, None);
    assert_eq!(parsed.target, "body");
    assert!(!parsed.list);
    assert!(!parsed.verbose);
}

#[test]
fn test_all_flags() {
    let args = make_args(&[
        "--config",
        "jtple.yaml",
        "--template",
        "post",
        "--values",
        "post.json",
        "--target",
        "#posts",
        "--output",
        "out.html",
        "--verbose",
        "./index.html",
    ]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert_eq!(parsed.config, Some(PathBuf::from("jtple.yaml")));
    assert_eq!(parsed.template.as_deref(), Some("post"));
    assert_eq!(parsed.values, Some(PathBuf::from("post.json")));
    assert_eq!(parsed.target, "#posts");
    assert_eq!(parsed.output, Some(PathBuf::from("out.html")));
    assert!(parsed.verbose);
}

#[test]
fn test_short_flags() {
    let args = make_args(&["-l", "-v", "-t", "post", "-d", "v.yml", "./index.html"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(parsed.list);
    assert!(parsed.verbose);
    assert_eq!(parsed.values, Some(PathBuf::from("v.yml")));
}

#[test]
fn test_values_require_template() {
    let args = make_args(&["--values", "v.json", "./index.html"]);
    assert!(Args::try_parse_from(args).is_err());
}

#[test]
fn test_missing_document() {
    let args = make_args(&[]);
    assert!(Args::try_parse_from(args).is_err());
}
