//! Results aggregation over realistic backend payloads

use pqtk_admin::results::{aggregate, feedback, AbxTally, Chart, MeanScore};
use pqtk_common::models::{ResultsList, TestType};
use serde_json::json;

fn results(value: serde_json::Value) -> ResultsList {
    serde_json::from_value(value).unwrap()
}

fn mean_of<'a>(means: &'a [MeanScore], sample_id: &str) -> &'a MeanScore {
    means.iter().find(|m| m.sample_id == sample_id).unwrap()
}

#[test]
fn empty_results_give_no_charts() {
    assert!(aggregate(&ResultsList::default()).is_empty());
    assert!(feedback(&ResultsList::default()).is_empty());
}

#[test]
fn ab_selections_are_counted_per_question() {
    let list = results(json!({"results": [
        {"type": "AB", "testNumber": 1, "selections": [
            {"questionId": "Brighter", "sampleId": "a.wav"},
            {"questionId": "Warmer", "sampleId": "b.wav"}
        ]},
        {"type": "AB", "testNumber": 1, "selections": [
            {"questionId": "Brighter", "sampleId": "a.wav"},
            {"questionId": "Warmer", "sampleId": "a.wav"}
        ]}
    ]}));

    let charts = aggregate(&list);
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].test_type, TestType::Ab);
    assert_eq!(charts[0].responses, 2);

    let Chart::Selections { counts, abx } = &charts[0].chart else {
        panic!("expected selections");
    };
    assert!(abx.is_none());
    let brighter_a = counts
        .iter()
        .find(|c| c.question_id == "Brighter" && c.sample_id == "a.wav")
        .unwrap();
    assert_eq!(brighter_a.count, 2);
    assert_eq!(counts.len(), 3);
}

#[test]
fn abx_tallies_correct_identifications() {
    let list = results(json!({"results": [
        {"type": "ABX", "testNumber": 2, "xSampleId": "a.wav", "xSelected": "a.wav", "selections": []},
        {"type": "ABX", "testNumber": 2, "xSampleId": "a.wav", "xSelected": "b.wav", "selections": []},
        {"type": "ABX", "testNumber": 2, "xSampleId": "b.wav", "xSelected": "b.wav"}
    ]}));

    let charts = aggregate(&list);
    let Chart::Selections { abx, .. } = &charts[0].chart else {
        panic!("expected selections");
    };
    assert_eq!(
        *abx,
        Some(AbxTally {
            correct: 2,
            incorrect: 1
        })
    );
}

#[test]
fn mushra_means_include_anchors_and_keep_first_reference() {
    let list = results(json!({"results": [
        {"type": "MUSHRA", "testNumber": 3, "referenceScore": 100,
         "anchorsScores": [{"sampleId": "lp35.wav", "score": 20}],
         "samplesScores": [{"sampleId": "codec.wav", "score": 70}]},
        {"type": "MUSHRA", "testNumber": 3, "referenceScore": 90,
         "anchorsScores": [{"sampleId": "lp35.wav", "score": 30}],
         "samplesScores": [{"sampleId": "codec.wav", "score": 80}]}
    ]}));

    let charts = aggregate(&list);
    let Chart::Mushra { reference_score, means } = &charts[0].chart else {
        panic!("expected MUSHRA chart");
    };
    assert_eq!(*reference_score, 100.0);
    assert_eq!(mean_of(means, "lp35.wav").mean, 25.0);
    assert_eq!(mean_of(means, "codec.wav").mean, 75.0);
    assert_eq!(mean_of(means, "codec.wav").count, 2);
}

#[test]
fn ape_means_per_axis() {
    let list = results(json!({"results": [
        {"type": "APE", "testNumber": 4, "axisResults": [
            {"axisId": "Warmth", "sampleRatings": [
                {"sampleId": "a.wav", "rating": 0.2}, {"sampleId": "b.wav", "rating": 0.8}]},
            {"axisId": "Clarity", "sampleRatings": [{"sampleId": "a.wav", "rating": 1.0}]}
        ]},
        {"type": "APE", "testNumber": 4, "axisResults": [
            {"axisId": "Warmth", "sampleRatings": [
                {"sampleId": "a.wav", "rating": 0.4}, {"sampleId": "b.wav", "rating": 0.6}]}
        ]}
    ]}));

    let charts = aggregate(&list);
    let Chart::Ape { axes } = &charts[0].chart else {
        panic!("expected APE chart");
    };
    let ids: Vec<&str> = axes.iter().map(|a| a.axis_id.as_str()).collect();
    assert_eq!(ids, vec!["Warmth", "Clarity"]);

    let warmth = &axes[0].samples;
    assert!((mean_of(warmth, "a.wav").mean - 0.3).abs() < 1e-9);
    assert!((mean_of(warmth, "b.wav").mean - 0.7).abs() < 1e-9);
    assert_eq!(mean_of(&axes[1].samples, "a.wav").count, 1);
}

#[test]
fn groups_follow_first_seen_order_then_type() {
    let list = results(json!({"results": [
        {"type": "AB", "testNumber": 2, "selections": [], "feedback": "  too quiet "},
        {"type": "AB", "testNumber": 1, "selections": []},
        {"type": "APE", "testNumber": 2, "axisResults": [], "feedback": "   "}
    ]}));

    let charts = aggregate(&list);
    let keys: Vec<(u32, TestType)> = charts.iter().map(|c| (c.test_number, c.test_type)).collect();
    assert_eq!(
        keys,
        vec![(2, TestType::Ab), (2, TestType::Ape), (1, TestType::Ab)]
    );
    assert_eq!(feedback(&list), vec![(2, "too quiet".to_string())]);

    let text = charts[0].to_string();
    assert!(text.starts_with("Test 2 (AB), 1 responses"));
}
