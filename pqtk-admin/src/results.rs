//! Results aggregation into chart-ready data
//!
//! Pure functions over a fetched [`ResultsList`]. Results are grouped by test
//! number in first-seen order, then by type (a test whose type changed
//! between runs yields one chart per type). Labels keep first-seen order so
//! output is deterministic.

use pqtk_common::models::{ResultsList, SampleScore, TestResult, TestType};
use std::fmt;

/// Selections for one (sample, question) pair
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCount {
    pub sample_id: String,
    pub question_id: String,
    pub count: usize,
}

/// ABX identification outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbxTally {
    pub correct: usize,
    pub incorrect: usize,
}

/// Average of every score given to one sample
#[derive(Debug, Clone, PartialEq)]
pub struct MeanScore {
    pub sample_id: String,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisMeans {
    pub axis_id: String,
    pub samples: Vec<MeanScore>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// AB and ABX: selection counts (ABX adds the identification tally)
    Selections {
        counts: Vec<SelectionCount>,
        abx: Option<AbxTally>,
    },
    Mushra {
        reference_score: f64,
        means: Vec<MeanScore>,
    },
    Ape {
        axes: Vec<AxisMeans>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestChart {
    pub test_number: u32,
    pub test_type: TestType,
    /// Number of results aggregated
    pub responses: usize,
    pub chart: Chart,
}

/// Build one chart per (test number, type) group
pub fn aggregate(results: &ResultsList) -> Vec<TestChart> {
    group(&results.results)
        .into_iter()
        .map(|(test_number, test_type, items)| TestChart {
            test_number,
            test_type,
            responses: items.len(),
            chart: chart_for(test_type, &items),
        })
        .collect()
}

/// Participant feedback as (test number, text)
pub fn feedback(results: &ResultsList) -> Vec<(u32, String)> {
    results
        .results
        .iter()
        .filter_map(|r| {
            let text = match r {
                TestResult::Ab(r) => r.feedback.as_deref(),
                TestResult::Abx(r) => r.feedback.as_deref(),
                TestResult::Mushra(r) => r.feedback.as_deref(),
                TestResult::Ape(r) => r.feedback.as_deref(),
            }?;
            let text = text.trim();
            (!text.is_empty()).then(|| (r.test_number(), text.to_string()))
        })
        .collect()
}

fn group(results: &[TestResult]) -> Vec<(u32, TestType, Vec<&TestResult>)> {
    let mut numbers: Vec<u32> = Vec::new();
    for r in results {
        if !numbers.contains(&r.test_number()) {
            numbers.push(r.test_number());
        }
    }

    let mut groups = Vec::new();
    for number in numbers {
        let mut types: Vec<TestType> = Vec::new();
        for r in results.iter().filter(|r| r.test_number() == number) {
            if !types.contains(&r.test_type()) {
                types.push(r.test_type());
            }
        }
        for test_type in types {
            let items: Vec<&TestResult> = results
                .iter()
                .filter(|r| r.test_number() == number && r.test_type() == test_type)
                .collect();
            groups.push((number, test_type, items));
        }
    }
    groups
}

fn chart_for(test_type: TestType, items: &[&TestResult]) -> Chart {
    match test_type {
        TestType::Ab | TestType::Abx => selection_chart(test_type, items),
        TestType::Mushra => mushra_chart(items),
        TestType::Ape => ape_chart(items),
    }
}

fn selection_chart(test_type: TestType, items: &[&TestResult]) -> Chart {
    let mut counts: Vec<SelectionCount> = Vec::new();
    let mut tally = AbxTally::default();

    for item in items {
        let selections = match item {
            TestResult::Ab(r) => &r.selections,
            TestResult::Abx(r) => {
                if r.is_correct() {
                    tally.correct += 1;
                } else {
                    tally.incorrect += 1;
                }
                &r.selections
            }
            _ => continue,
        };
        for s in selections {
            match counts
                .iter_mut()
                .find(|c| c.sample_id == s.sample_id && c.question_id == s.question_id)
            {
                Some(c) => c.count += 1,
                None => counts.push(SelectionCount {
                    sample_id: s.sample_id.clone(),
                    question_id: s.question_id.clone(),
                    count: 1,
                }),
            }
        }
    }

    Chart::Selections {
        counts,
        abx: (test_type == TestType::Abx).then_some(tally),
    }
}

/// Running mean accumulator keyed by sample id, first-seen order
#[derive(Default)]
struct Means {
    entries: Vec<(String, f64, usize)>,
}

impl Means {
    fn add(&mut self, sample_id: &str, value: f64) {
        match self.entries.iter_mut().find(|(id, _, _)| id == sample_id) {
            Some((_, sum, n)) => {
                *sum += value;
                *n += 1;
            }
            None => self.entries.push((sample_id.to_string(), value, 1)),
        }
    }

    fn finish(self) -> Vec<MeanScore> {
        self.entries
            .into_iter()
            .map(|(sample_id, sum, count)| MeanScore {
                sample_id,
                mean: sum / count as f64,
                count,
            })
            .collect()
    }
}

fn mushra_chart(items: &[&TestResult]) -> Chart {
    let mut reference_score = None;
    let mut means = Means::default();

    for item in items {
        let TestResult::Mushra(r) = item else {
            continue;
        };
        reference_score.get_or_insert(r.reference_score);
        let scores: Vec<&SampleScore> = r.anchors_scores.iter().chain(&r.samples_scores).collect();
        for score in scores {
            means.add(&score.sample_id, score.score);
        }
    }

    Chart::Mushra {
        reference_score: reference_score.unwrap_or_default(),
        means: means.finish(),
    }
}

fn ape_chart(items: &[&TestResult]) -> Chart {
    let mut axes: Vec<(String, Means)> = Vec::new();

    for item in items {
        let TestResult::Ape(r) = item else {
            continue;
        };
        for axis in &r.axis_results {
            let pos = match axes.iter().position(|(id, _)| *id == axis.axis_id) {
                Some(pos) => pos,
                None => {
                    axes.push((axis.axis_id.clone(), Means::default()));
                    axes.len() - 1
                }
            };
            for rating in &axis.sample_ratings {
                axes[pos].1.add(&rating.sample_id, rating.rating);
            }
        }
    }

    Chart::Ape {
        axes: axes
            .into_iter()
            .map(|(axis_id, means)| AxisMeans {
                axis_id,
                samples: means.finish(),
            })
            .collect(),
    }
}

impl fmt::Display for TestChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Test {} ({}), {} responses",
            self.test_number, self.test_type, self.responses
        )?;
        match &self.chart {
            Chart::Selections { counts, abx } => {
                for c in counts {
                    writeln!(f, "  {:<30} {:<30} {:>5}", c.question_id, c.sample_id, c.count)?;
                }
                if let Some(t) = abx {
                    writeln!(f, "  correct: {}  incorrect: {}", t.correct, t.incorrect)?;
                }
            }
            Chart::Mushra {
                reference_score,
                means,
            } => {
                writeln!(f, "  {:<40} {:>8.2}", "reference", reference_score)?;
                for m in means {
                    writeln!(f, "  {:<40} {:>8.2}", m.sample_id, m.mean)?;
                }
            }
            Chart::Ape { axes } => {
                for axis in axes {
                    writeln!(f, "  {}", axis.axis_id)?;
                    for m in &axis.samples {
                        writeln!(f, "    {:<38} {:>8.3}", m.sample_id, m.mean)?;
                    }
                }
            }
        }
        Ok(())
    }
}
