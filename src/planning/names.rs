//! Planner identifiers derived from task IDs.
//!
//! Task IDs come straight from scheduling exports and may contain spaces,
//! dots or slashes. Planner names are restricted to `[A-Za-z0-9_-]`, start
//! with a letter, and compare case-insensitively.

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object name for a task (`t_<id>`).
pub fn task_object(task_id: &str) -> String {
    format!("t_{}", sanitize(task_id))
}

/// Durative action name for a task (`do_<id>`).
pub fn action_name(task_id: &str) -> String {
    format!("do_{}", sanitize(task_id))
}

/// Problem name for one chunk of a schedule.
pub fn problem_name(schedule_id: &str, chunk: impl std::fmt::Display) -> String {
    format!("p_{}_{}", sanitize(schedule_id), chunk)
}

/// Key under which two identifiers collide in a planner.
pub fn collision_key(task_id: &str) -> String {
    sanitize(task_id).to_ascii_lowercase()
}

/// Format a duration in days without float noise (at most 4 decimals).
///
/// A positive value too small for 4 decimals keeps its full digits so it
/// never renders as `0`.
pub fn format_days(days: f64) -> String {
    let text = format!("{:.4}", days);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if days > 0.0 && text == "0" {
        return days.to_string();
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("A-10.2 / east"), "A-10_2___east");
        assert_eq!(sanitize("plain_id"), "plain_id");
    }

    #[test]
    fn test_prefixed_names() {
        assert_eq!(task_object("1001"), "t_1001");
        assert_eq!(action_name("1001"), "do_1001");
        assert_eq!(problem_name("proj 7", "chunk_2"), "p_proj_7_chunk_2");
    }

    #[test]
    fn test_collision_key_is_case_insensitive() {
        assert_eq!(collision_key("Wall.A"), collision_key("wall_a"));
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(4.0), "4");
        assert_eq!(format_days(0.5), "0.5");
        assert_eq!(format_days(1.0 / 3.0), "0.3333");
        assert_eq!(format_days(2.25), "2.25");
    }

    #[test]
    fn test_format_tiny_positive_days() {
        assert_eq!(format_days(0.00001), "0.00001");
        assert_ne!(format_days(3.0 / 86_400.0), "0");
        assert_eq!(format_days(0.0), "0");
    }
}
