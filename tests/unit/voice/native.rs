use super::*;

#[test]
fn say_listing_keeps_multi_word_names() {
    let out = "\
Alex                en_US    # Most people recognize me by my voice.
Bad News            en_US    # The light you see at the end of the tunnel is the headlamp.
Amélie              fr_CA    # Bonjour, je m'appelle Amélie.
";
    let voices = parse_say_voices(out);
    assert_eq!(voices.len(), 3);
    assert_eq!(voices[1].id, "Bad News");
    assert_eq!(voices[1].lang.as_deref(), Some("en_US"));
    assert_eq!(voices[2].name, "Amélie");
}

#[test]
fn espeak_listing_skips_header_and_reads_columns() {
    let out = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";
    let voices = parse_espeak_voices(out);
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].id, "gmw/af");
    assert_eq!(voices[0].lang.as_deref(), Some("af"));
    assert_eq!(voices[1].name, "English (America)");
}

#[test]
fn garbage_listing_yields_nothing() {
    assert!(parse_say_voices("\n\n").is_empty());
    assert!(parse_espeak_voices("header only\n").is_empty());
}

#[test]
fn speak_args_map_speed_to_rate_flags() {
    let opts = SpeakOptions { speed: Some(2.0) };
    assert_eq!(
        SpeechCommand::Say.speak_args("hi", Some("Alex"), &opts),
        vec!["-v", "Alex", "-r", "350", "--", "hi"]
    );
    assert_eq!(
        SpeechCommand::EspeakNg.speak_args("-dash", None, &SpeakOptions::default()),
        vec!["--", "-dash"]
    );
    assert_eq!(
        SpeechCommand::EspeakNg.speak_args("x", Some(""), &SpeakOptions { speed: Some(0.5) }),
        vec!["-s", "88", "--", "x"]
    );
}

#[test]
fn descriptor_reports_native_id() {
    let d = NativeProvider::default().descriptor();
    assert_eq!(d.id, ProviderId::Native);
    assert_eq!(d.display_name, "System Native");
}
