use agentspace_engine::{disposition_filename, download_filename};
use pretty_assertions::assert_eq;

#[test]
fn extended_filename_is_percent_decoded() {
    assert_eq!(
        disposition_filename("attachment; filename*=UTF-8''%E6%8A%A5%E5%91%8A.docx").as_deref(),
        Some("报告.docx")
    );
}

#[test]
fn extended_filename_wins_over_plain() {
    let header = r#"attachment; filename="fallback.txt"; filename*=UTF-8''real%20name.txt"#;
    assert_eq!(disposition_filename(header).as_deref(), Some("real name.txt"));
}

#[test]
fn plain_filename_is_unquoted() {
    assert_eq!(
        disposition_filename(r#"attachment; filename="report.pdf""#).as_deref(),
        Some("report.pdf")
    );
    assert_eq!(disposition_filename("inline"), None);
}

#[test]
fn download_name_keeps_extension_and_is_deterministic() {
    let first = download_filename(Some("report.PDF"), "f-1");
    let again = download_filename(Some("report.PDF"), "f-1");
    let other = download_filename(Some("report.PDF"), "f-2");

    assert_eq!(first, again);
    assert_ne!(first, other);
    assert!(first.starts_with("report--"), "{first}");
    assert!(first.ends_with(".pdf"), "{first}");
}

#[test]
fn path_separators_cannot_escape_the_download_dir() {
    let name = download_filename(Some("../../etc/passwd"), "f-1");
    assert!(!name.contains('/'), "{name}");
    assert!(!name.starts_with('.'), "{name}");
}

#[test]
fn missing_name_falls_back_to_file_id() {
    let name = download_filename(None, "file-42");
    assert!(name.starts_with("file-42--"), "{name}");

    let blank = download_filename(Some("   "), "file-42");
    assert_eq!(blank, name);
}

#[test]
fn reserved_windows_names_are_suffixed() {
    assert!(download_filename(Some("con.txt"), "f").starts_with("con_--"));
}

#[test]
fn long_multibyte_names_are_cut_on_a_char_boundary() {
    let long = "é".repeat(100);
    let name = download_filename(Some(&long), "f");
    let stem = name.split("--").next().unwrap();
    assert!(stem.len() <= 80);
    assert!(stem.chars().all(|c| c == 'é'));
}
