use rpp_core::{parse, serialize, Project, Value};

const FIXTURE: &str = r#"<REAPER_PROJECT 0.1 "6.80/linux-x86_64" 1699999999
  # saved by hand
  RIPPLE 0
  <NOTES 0 2
    |Verse riff, keep it dry.
    |  indented note line
  >
  TEMPO 120.000 4 4 0
  PLAYRATE 1 0 0.25 4
  SAMPLERATE 48000 0 0
  RENDER_FILE "C:\renders\"
  <RECORD_CFG
    ZXZhdxgAAA==
  >

  <TRACK {5B0C1F8E-1D2C-4A3B-9E8F-7A6B5C4D3E2F}
    NAME 'Lead "Vox"'
    PEAKCOL 16576
    VOLPAN 1.000000 0 -1 -1 1
    <FXCHAIN
      SHOW 0
      <VST "VSTi: ReaSynth (Cockos)" reasynth.vst.dylib 0 "" 1919251321<5653546872736E7265617379>
        eXNlcu5e7f4CAAAAAQAAAAAAAAACAAAAAAAAAAIAAAABAAAAAAAAAAIAAAAAAAAAPAAAAAAAAAAAABA
        AAAQAAAA
      >
      FXID {11111111-2222-3333-4444-555555555555}
    >
    <ITEM
      POSITION 0.00000000000000
      LENGTH 7.5
      LOOP 1
      IGUID {AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}
      <SOURCE MIDI
        HASDATA 1 960 QN
        E 0 90 3c 60
        E 480 80 3c 00
        GUID {99999999-8888-7777-6666-555555555555}
      >
    >
  >
  <FUTURE_THING x=1 `tick quoted`
    // unknown to every view
    WIDGET 0xFF -0 1e3
  >
>
"#;

#[test]
fn untouched_fixture_is_reproduced_byte_for_byte() {
    let doc = parse(FIXTURE).expect("fixture should parse");
    assert_eq!(serialize(&doc), FIXTURE);
}

#[test]
fn crlf_and_missing_final_newline_are_preserved() {
    let crlf = FIXTURE.replace('\n', "\r\n");
    let doc = parse(&crlf).expect("crlf fixture should parse");
    assert_eq!(serialize(&doc), crlf);

    let trimmed = FIXTURE.trim_end_matches('\n');
    let doc = parse(trimmed).expect("fixture without final newline should parse");
    assert_eq!(serialize(&doc), trimmed);
}

#[test]
fn reparsing_serialized_output_is_structurally_identical() {
    let first = parse(FIXTURE).expect("fixture should parse");
    let second = parse(&serialize(&first)).expect("serialized text should parse");
    assert!(first.root().same_structure(second.root()));
}

#[test]
fn numerics_keep_their_written_form() {
    let doc = parse(FIXTURE).expect("fixture should parse");
    let text = serialize(&doc);
    assert!(text.contains("TEMPO 120.000 4 4 0"));
    assert!(text.contains("POSITION 0.00000000000000"));
    assert!(text.contains("VOLPAN 1.000000 0 -1 -1 1"));
    assert!(text.contains("WIDGET 0xFF -0 1e3"));

    let tempo = doc.root().find_child("TEMPO").expect("tempo directive");
    assert_eq!(tempo.param(0), Some(&Value::Float(120.0)));
}

#[test]
fn views_read_through_unknown_content() {
    let doc = parse(FIXTURE).expect("fixture should parse");
    let project = Project::new(&doc);
    assert_eq!(project.render_file().as_deref(), Some(r"C:\renders\"));
    assert_eq!(project.sample_rate().expect("sample rate"), Some(48000));

    let summary = project.summary().expect("summary should build");
    assert_eq!(summary.tracks.len(), 1);
    assert_eq!(summary.tracks[0].name, "Lead \"Vox\"");
    let item = &summary.tracks[0].items[0];
    assert_eq!(item.length, 7.5);
    assert_eq!(item.file, None);
    assert_eq!(item.format, "MIDI");
}

#[test]
fn notes_lines_are_opaque() {
    let doc = parse(FIXTURE).expect("fixture should parse");
    let notes = doc.root().find_child("NOTES").expect("notes block");
    assert_eq!(notes.children().len(), 2);
    assert_eq!(notes.children()[0].tag(), "|Verse riff, keep it dry.");
    assert!(notes.children()[1].params().is_empty());
}

#[test]
fn one_crlf_line_in_lf_text_stays_as_written() {
    let source = "<REAPER_PROJECT 0.1\n  RIPPLE 0\r\n  TEMPO 120 4 4\n>\n";
    let doc = parse(source).expect("mixed text should parse");
    assert_eq!(serialize(&doc), source);
}
