use crate::routes::proposal::model::Proposal;
use crate::routes::teacher::model::Teacher;

/// 没有选题书时所有教师并列的中性分
const NEUTRAL_SCORE: i32 = 50;
const FIELD_MATCH_BONUS: i32 = 40;
const TOPIC_KEYWORD_BONUS: i32 = 20;
const TOPIC_TITLE_BONUS: i32 = 15;
const CAPACITY_PENALTY: i32 = 30;

fn contains_either(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// 按选题书相关度给教师打分，0-100
pub fn score_teacher(teacher: &Teacher, proposal: Option<&Proposal>) -> u8 {
    let Some(proposal) = proposal else {
        return NEUTRAL_SCORE as u8;
    };

    let mut score = 0i32;

    if contains_either(&teacher.research_field, &proposal.field) {
        score += FIELD_MATCH_BONUS;
    }

    // 多个接收方向可以叠加加分
    let title = proposal.title.trim().to_lowercase();
    for topic in &teacher.accepted_topics {
        if proposal
            .keywords
            .iter()
            .any(|kw| contains_either(topic, kw))
        {
            score += TOPIC_KEYWORD_BONUS;
        }
        let topic_lower = topic.trim().to_lowercase();
        if !topic_lower.is_empty() && title.contains(&topic_lower) {
            score += TOPIC_TITLE_BONUS;
        }
    }

    if teacher.current_students_count >= teacher.max_students {
        score -= CAPACITY_PENALTY;
    }

    score.clamp(0, 100) as u8
}

/// 给教师列表打分并按分数降序排列，
/// 同分保持输入顺序（稳定排序），结果可复现
pub fn rank_teachers(teachers: Vec<Teacher>, proposal: Option<&Proposal>) -> Vec<(Teacher, u8)> {
    let mut ranked: Vec<(Teacher, u8)> = teachers
        .into_iter()
        .map(|t| {
            let score = score_teacher(&t, proposal);
            (t, score)
        })
        .collect();
    ranked.sort_by_key(|(_, score)| std::cmp::Reverse(*score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn teacher(id: &str, field: &str, topics: &[&str], current: i32, max: i32) -> Teacher {
        Teacher {
            teacher_id: id.to_string(),
            full_name: format!("老师{}", id),
            email: format!("{}@uni.edu", id),
            password_hash: None,
            department: "CSE".into(),
            research_field: field.to_string(),
            publications: serde_json::json!([]),
            max_students: max,
            current_students_count: current,
            accepted_topics: topics.iter().map(|s| s.to_string()).collect(),
            status: "active".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn proposal(title: &str, field: &str, keywords: &[&str]) -> Proposal {
        Proposal {
            proposal_id: "p1".into(),
            group_id: "g1".into(),
            title: title.to_string(),
            description: String::new(),
            full_proposal: None,
            field: field.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            project_type: "thesis".into(),
            status: "submitted".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn no_proposal_all_neutral_input_order_kept() {
        let teachers = vec![
            teacher("T1", "AI", &[], 0, 5),
            teacher("T2", "Networks", &[], 0, 5),
            teacher("T3", "Security", &[], 0, 5),
        ];
        let ranked = rank_teachers(teachers, None);
        let ids: Vec<&str> = ranked.iter().map(|(t, _)| t.teacher_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
        assert!(ranked.iter().all(|(_, s)| *s == 50));
    }

    #[test]
    fn field_match_is_case_insensitive_and_bidirectional() {
        let p = proposal("Some Title", "machine learning", &[]);
        let t1 = teacher("T1", "Machine Learning and Vision", &[], 0, 5);
        let t2 = teacher("T2", "Learning", &[], 0, 5);
        // 教师方向包含选题领域
        assert_eq!(score_teacher(&t1, Some(&p)), 40);
        // 选题领域包含教师方向
        assert_eq!(score_teacher(&t2, Some(&p)), 40);
    }

    #[test]
    fn topic_bonuses_stack_across_topics() {
        let p = proposal(
            "Deep Learning for NLP",
            "AI",
            &["deep learning", "transformers"],
        );
        // 两个方向各命中关键词+20，其中一个还出现在标题里+15
        let t = teacher("T1", "AI", &["Deep Learning", "Transformers in NLP"], 0, 5);
        // 领域40 + 20 + 15（"deep learning"在标题中）+ 20 = 95
        assert_eq!(score_teacher(&t, Some(&p)), 95);
    }

    #[test]
    fn capacity_penalty_applies_at_full() {
        let p = proposal("Graph Databases", "databases", &[]);
        let full = teacher("T1", "Databases", &[], 3, 3);
        let free = teacher("T2", "Databases", &[], 2, 3);
        assert_eq!(score_teacher(&full, Some(&p)), 10); // 40 - 30
        assert_eq!(score_teacher(&free, Some(&p)), 40);
    }

    #[test]
    fn score_clamped_to_zero_and_hundred() {
        let p = proposal("x", "totally unrelated", &[]);
        let overloaded = teacher("T1", "something else", &[], 9, 3);
        assert_eq!(score_teacher(&overloaded, Some(&p)), 0);

        let p2 = proposal(
            "ml ai nlp cv",
            "ai",
            &["ml", "ai", "nlp", "cv"],
        );
        let star = teacher("T2", "AI", &["ml", "ai", "nlp", "cv"], 0, 5);
        assert_eq!(score_teacher(&star, Some(&p2)), 100);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let p = proposal("Edge Computing", "iot", &["edge"]);
        let teachers = vec![
            teacher("T1", "Robotics", &[], 0, 5),      // 0
            teacher("T2", "IoT Systems", &[], 0, 5),   // 40
            teacher("T3", "Compilers", &[], 0, 5),     // 0，与T1同分应排其后
            teacher("T4", "IoT", &["edge"], 0, 5),     // 40+20+15=75
        ];
        let first = rank_teachers(teachers.clone(), Some(&p));
        let ids: Vec<&str> = first.iter().map(|(t, _)| t.teacher_id.as_str()).collect();
        assert_eq!(ids, vec!["T4", "T2", "T1", "T3"]);

        // 重复调用结果一致
        let second = rank_teachers(teachers, Some(&p));
        let ids2: Vec<&str> = second.iter().map(|(t, _)| t.teacher_id.as_str()).collect();
        assert_eq!(ids, ids2);
    }
}
