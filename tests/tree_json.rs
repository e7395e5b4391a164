/*!
Analysis of syntax trees supplied as JSON
*/

use pretty_assertions::assert_eq;
use pshelp_analyzer::{
    analyze_source, analyze_tree_json, tree_from_json, AnalysisError, AnalyzerConfig,
    RulesEngine, ScriptParser,
};

fn engine() -> RulesEngine {
    let mut config = AnalyzerConfig::default();
    config.settings.dynamic_parameters.enabled = false;
    RulesEngine::new(config)
}

const SCRIPT: &str = "<#\n.PARAMETER Name\n    Who.\n#>\nfunction Greet {\n    param($Name, $Greeting)\n    \"$Greeting $Name\"\n}\n";

#[test]
fn test_dumped_tree_gives_same_findings() {
    let tree = ScriptParser::new().parse(SCRIPT, Some("greet.ps1")).unwrap();
    let json = serde_json::to_string(&tree).unwrap();

    let from_json = analyze_tree_json(&engine(), &json, None).unwrap();
    let from_source = analyze_source(&engine(), SCRIPT, Some("greet.ps1")).unwrap();
    assert_eq!(from_json, from_source);
    assert_eq!(from_json.len(), 1);
    assert_eq!(from_json[0].subject.as_deref(), Some("Greeting"));
}

#[test]
fn test_tree_roundtrips_through_json() {
    let tree = ScriptParser::new().parse(SCRIPT, None).unwrap();
    let json = serde_json::to_string_pretty(&tree).unwrap();
    assert_eq!(tree_from_json(&json).unwrap(), Some(tree));
}

#[test]
fn test_null_tree_is_absent() {
    let err = analyze_tree_json(&engine(), "null", Some("x.ps1")).unwrap_err();
    assert!(matches!(err, AnalysisError::NullAst));
    assert_eq!(err.to_string(), AnalysisError::NullAst.to_string());
}

#[test]
fn test_malformed_json_is_parse_error() {
    let err = analyze_tree_json(&engine(), "{ \"extent\": ", None).unwrap_err();
    assert!(matches!(err, AnalysisError::Parse { .. }));
}

#[test]
fn test_caller_file_name_wins_over_recorded_one() {
    let tree = ScriptParser::new().parse(SCRIPT, Some("greet.ps1")).unwrap();
    let json = serde_json::to_string(&tree).unwrap();

    let named = analyze_tree_json(&engine(), &json, Some("override.ps1")).unwrap();
    assert_eq!(named[0].script_path.as_deref(), Some("override.ps1"));

    let unnamed = analyze_tree_json(&engine(), &json, None).unwrap();
    assert_eq!(unnamed[0].script_path.as_deref(), Some("greet.ps1"));
}
