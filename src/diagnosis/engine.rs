// src/diagnosis/engine.rs
//
// The tiered rule table of the legacy scoring questionnaire. Two levels of
// routing (route flag, then a stage-2 threshold) narrow the field to one
// sub-branch of four candidate authors; when a stage-3 answer pattern is
// available each candidate is scored by its own point function, otherwise a
// pure score-threshold table decides.

use crate::models::author::AuthorCandidate;
use crate::models::stage::Stage3Answers;

/// Points a winner needs in the Leader, Mypace and Sensitive sub-branches.
const STANDARD_POINT_BAR: u32 = 2;

/// The Rare sub-branch demands a stronger answer signature.
const RARE_POINT_BAR: u32 = 3;

/// Stage-2 threshold splitting the general route.
const GENERAL_BRANCH_THRESHOLD: i64 = 30;

/// Stage-2 threshold splitting the literary route.
const LITERARY_BRANCH_THRESHOLD: i64 = 15;

/// Score thresholds of the fallback table, strictly descending. The zero
/// floor means the last entry always matches.
const FALLBACK_THRESHOLDS: [i64; 4] = [35, 25, 15, 0];

type PointFn = fn(&Stage3Answers, i64) -> u32;

/// One candidate row of the rule table: the author id and its bespoke
/// point function.
struct CandidateRule {
    author: &'static str,
    points: PointFn,
}

/// A second-level branch: four candidates in fallback order plus the
/// minimum points bar an answer-based winner must clear.
struct SubBranch {
    candidates: [CandidateRule; 4],
    point_bar: u32,
}

const LEADER: SubBranch = SubBranch {
    candidates: [
        CandidateRule { author: "kikuti", points: kikuti_points },
        CandidateRule { author: "kouyou", points: kouyou_points },
        CandidateRule { author: "siga", points: siga_points },
        CandidateRule { author: "ranpo", points: ranpo_points },
    ],
    point_bar: STANDARD_POINT_BAR,
};

const MYPACE: SubBranch = SubBranch {
    candidates: [
        CandidateRule { author: "itiyou", points: itiyou_points },
        CandidateRule { author: "kahuu", points: kahuu_points },
        CandidateRule { author: "bizan", points: bizan_points },
        CandidateRule { author: "simada", points: simada_points },
    ],
    point_bar: STANDARD_POINT_BAR,
};

const RARE: SubBranch = SubBranch {
    candidates: [
        CandidateRule { author: "natume", points: natume_points },
        CandidateRule { author: "ougai", points: ougai_points },
        CandidateRule { author: "tanizaki", points: tanizaki_points },
        CandidateRule { author: "saneatu", points: saneatu_points },
    ],
    point_bar: RARE_POINT_BAR,
};

const SENSITIVE: SubBranch = SubBranch {
    candidates: [
        CandidateRule { author: "kazii", points: kazii_points },
        CandidateRule { author: "akutagawa", points: akutagawa_points },
        CandidateRule { author: "zenzou", points: zenzou_points },
        CandidateRule { author: "dazai", points: dazai_points },
    ],
    point_bar: STANDARD_POINT_BAR,
};

// Per-author point functions. Each awards fixed points for specific answer
// matches plus one bonus point past an author-specific stage-3 threshold.
// They are deliberately not symmetric across candidates.

fn kikuti_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques1.as_deref() == Some("10") {
        points += 2;
    }
    if answers.ques2.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 25 {
        points += 1;
    }
    points
}

fn kouyou_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques1.as_deref() == Some("7") {
        points += 2;
    }
    if answers.ques4.as_deref() == Some("5") {
        points += 1;
    }
    if stage3_score >= 20 {
        points += 1;
    }
    points
}

fn siga_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques2.as_deref() == Some("10") {
        points += 2;
    }
    if answers.ques3.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 15 {
        points += 1;
    }
    points
}

fn ranpo_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques5.as_deref() == Some("3") {
        points += 2;
    }
    if answers.ques3.as_deref() == Some("0") {
        points += 1;
    }
    if stage3_score >= 10 {
        points += 1;
    }
    points
}

fn itiyou_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques3.as_deref() == Some("10") {
        points += 2;
    }
    if answers.ques1.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 25 {
        points += 1;
    }
    points
}

fn kahuu_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques4.as_deref() == Some("10") {
        points += 2;
    }
    if answers.ques2.as_deref() == Some("5") {
        points += 1;
    }
    if stage3_score >= 15 {
        points += 1;
    }
    points
}

fn bizan_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques2.as_deref() == Some("3") {
        points += 2;
    }
    if answers.ques5.as_deref() == Some("5") {
        points += 1;
    }
    if stage3_score >= 10 {
        points += 1;
    }
    points
}

fn simada_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques5.as_deref() == Some("10") {
        points += 1;
    }
    if answers.ques3.as_deref() == Some("10") {
        points += 1;
    }
    if answers.ques2.as_deref() == Some("10") {
        points += 1;
    }
    if stage3_score >= 30 {
        points += 1;
    }
    points
}

fn natume_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques1.as_deref() == Some("10") {
        points += 3;
    }
    if answers.ques3.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 30 {
        points += 1;
    }
    points
}

fn ougai_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques2.as_deref() == Some("10") {
        points += 2;
    }
    if answers.ques4.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 25 {
        points += 1;
    }
    points
}

fn tanizaki_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques4.as_deref() == Some("10") {
        points += 3;
    }
    if answers.ques5.as_deref() == Some("7") {
        points += 1;
    }
    if stage3_score >= 20 {
        points += 1;
    }
    points
}

fn saneatu_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques3.as_deref() == Some("5") {
        points += 2;
    }
    if answers.ques1.as_deref() == Some("5") {
        points += 1;
    }
    if stage3_score >= 15 {
        points += 1;
    }
    points
}

fn kazii_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques5.as_deref() == Some("7") {
        points += 2;
    }
    if answers.ques2.as_deref() == Some("3") {
        points += 1;
    }
    if stage3_score >= 25 {
        points += 1;
    }
    points
}

fn akutagawa_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques1.as_deref() == Some("3") {
        points += 2;
    }
    if answers.ques4.as_deref() == Some("3") {
        points += 1;
    }
    if stage3_score >= 20 {
        points += 1;
    }
    points
}

fn zenzou_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques3.as_deref() == Some("3") {
        points += 2;
    }
    if answers.ques5.as_deref() == Some("0") {
        points += 1;
    }
    if stage3_score >= 10 {
        points += 1;
    }
    points
}

fn dazai_points(answers: &Stage3Answers, stage3_score: i64) -> u32 {
    let mut points = 0;
    if answers.ques2.as_deref() == Some("0") {
        points += 2;
    }
    if answers.ques1.as_deref() == Some("0") {
        points += 1;
    }
    if stage3_score >= 5 {
        points += 1;
    }
    points
}

/// Maps the accumulated scores (and, when available, the stage-3 answer
/// pattern) to one of the sixteen author ids.
///
/// Pure and total: no side effects, every input yields an id, identical
/// inputs yield identical ids. Safe to call reentrantly.
pub fn classify(
    stage1_score: i64,
    stage2_score: i64,
    stage3_score: i64,
    is_general: bool,
    answers: Option<&Stage3Answers>,
) -> &'static str {
    // The legacy tree routes on stage 2 and buckets on stage 3; stage 1
    // only gates validation upstream.
    let _ = stage1_score;

    if is_general {
        if stage2_score >= GENERAL_BRANCH_THRESHOLD {
            resolve(&LEADER, stage3_score, answers)
        } else {
            resolve(&MYPACE, stage3_score, answers)
        }
    } else if stage2_score >= LITERARY_BRANCH_THRESHOLD {
        // Rare sub-branch: simada's answer signature overrides the
        // candidate table outright.
        if let Some(answers) = answers {
            let points = simada_points(answers, stage3_score);
            if points >= 3 || (points >= 2 && stage3_score >= 35) {
                return "simada";
            }
        }
        resolve(&RARE, stage3_score, answers)
    } else {
        resolve(&SENSITIVE, stage3_score, answers)
    }
}

fn resolve(
    branch: &SubBranch,
    stage3_score: i64,
    answers: Option<&Stage3Answers>,
) -> &'static str {
    if let Some(answers) = answers {
        let mut best: Option<AuthorCandidate> = None;
        for rule in &branch.candidates {
            let points = (rule.points)(answers, stage3_score);
            // Strictly-greater replacement: ties keep the earlier candidate.
            if best.map_or(true, |current| points > current.points) {
                best = Some(AuthorCandidate { author: rule.author, points });
            }
        }
        if let Some(winner) = best {
            if winner.points >= branch.point_bar {
                return winner.author;
            }
        }
    }

    fallback_author(branch, stage3_score)
}

/// Pure score-threshold table: first threshold met wins. The trailing
/// last-candidate return mirrors the legacy table's defensive tail; with a
/// zero floor it cannot trigger for in-range scores, and it stays anyway.
fn fallback_author(branch: &SubBranch, stage3_score: i64) -> &'static str {
    for (threshold, rule) in FALLBACK_THRESHOLDS.iter().zip(&branch.candidates) {
        if stage3_score >= *threshold {
            return rule.author;
        }
    }
    branch.candidates[branch.candidates.len() - 1].author
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::author::find_author;
    use std::collections::HashSet;

    fn answers(values: [&str; 5]) -> Stage3Answers {
        Stage3Answers {
            ques1: Some(values[0].to_string()),
            ques2: Some(values[1].to_string()),
            ques3: Some(values[2].to_string()),
            ques4: Some(values[3].to_string()),
            ques5: Some(values[4].to_string()),
        }
    }

    #[test]
    fn test_classify_always_yields_a_known_author() {
        let mut seen = HashSet::new();
        for is_general in [true, false] {
            for stage2 in 0..=50 {
                for stage3 in 0..=50 {
                    let id = classify(25, stage2, stage3, is_general, None);
                    assert!(find_author(id).is_some(), "unknown id {id}");
                    seen.insert(id);
                }
            }
        }
        // Score-only classification alone reaches all sixteen categories.
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let answers = answers(["10", "7", "5", "5", "7"]);
        let first = classify(30, 30, 28, true, Some(&answers));
        let second = classify(30, 30, 28, true, Some(&answers));
        assert_eq!(first, second);
    }

    #[test]
    fn test_leader_full_match_selects_kikuti() {
        let answers = answers(["10", "7", "5", "5", "7"]);
        assert_eq!(classify(20, 30, 28, true, Some(&answers)), "kikuti");
    }

    #[test]
    fn test_leader_score_fallback_buckets() {
        // 24 sits in the >= 15 bucket, not the >= 25 one.
        assert_eq!(classify(20, 30, 24, true, None), "siga");
        assert_eq!(classify(20, 30, 28, true, None), "kouyou");
        assert_eq!(classify(20, 30, 35, true, None), "kikuti");
        assert_eq!(classify(20, 30, 3, true, None), "ranpo");
    }

    #[test]
    fn test_general_route_splits_at_thirty() {
        assert_eq!(classify(0, 30, 40, true, None), "kikuti");
        assert_eq!(classify(0, 29, 40, true, None), "itiyou");
    }

    #[test]
    fn test_literary_route_splits_at_fifteen() {
        assert_eq!(classify(0, 15, 40, false, None), "natume");
        assert_eq!(classify(0, 14, 40, false, None), "kazii");
    }

    #[test]
    fn test_sensitive_fallback_picks_akutagawa() {
        assert_eq!(classify(20, 10, 26, false, None), "akutagawa");
    }

    #[test]
    fn test_simada_signature_overrides_rare_candidates() {
        // Three signature matches reach the disjunctive bar on their own,
        // whatever the stage-3 score.
        let answers = answers(["0", "10", "10", "0", "10"]);
        assert_eq!(classify(10, 20, 5, false, Some(&answers)), "simada");
        assert_eq!(classify(50, 50, 50, false, Some(&answers)), "simada");
    }

    #[test]
    fn test_rare_bar_unmet_falls_back_to_score_table() {
        // All-zero answers score at most 1 point for any Rare candidate.
        let answers = answers(["0", "0", "0", "0", "0"]);
        assert_eq!(classify(0, 20, 20, false, Some(&answers)), "tanizaki");
    }

    #[test]
    fn test_standard_bar_unmet_falls_back_too() {
        // ranpo tops the Leader list with 1 point, short of the bar.
        let answers = answers(["5", "5", "0", "0", "5"]);
        assert_eq!(classify(0, 30, 0, true, Some(&answers)), "ranpo");
        assert_eq!(
            classify(0, 30, 0, true, Some(&answers)),
            classify(0, 30, 0, true, None)
        );
    }

    #[test]
    fn test_ties_keep_the_earlier_candidate() {
        // No matches at all: every Mypace candidate scores only its bonus.
        // bizan and simada both hold 1 at stage3=12; neither clears the bar,
        // and the fallback table picks deterministically.
        let answers = answers(["0", "7", "7", "7", "7"]);
        let id = classify(0, 0, 12, true, Some(&answers));
        assert_eq!(id, classify(0, 0, 12, true, Some(&answers)));
    }

    #[test]
    fn test_fallback_tail_returns_last_candidate() {
        // Out-of-range scores never occur through the validated path; the
        // defensive tail still answers with the branch's last candidate.
        assert_eq!(classify(0, 0, -1, false, None), "dazai");
        assert_eq!(classify(0, 30, -1, true, None), "ranpo");
    }

    #[test]
    fn test_mypace_fallback_buckets() {
        assert_eq!(classify(0, 0, 50, true, None), "itiyou");
        assert_eq!(classify(0, 0, 30, true, None), "kahuu");
        assert_eq!(classify(0, 0, 16, true, None), "bizan");
        assert_eq!(classify(0, 0, 0, true, None), "simada");
    }

    #[test]
    fn test_stage1_score_does_not_affect_the_result() {
        for stage1 in [0, 25, 50] {
            assert_eq!(classify(stage1, 30, 24, true, None), "siga");
        }
    }
}
