//! Blessing (quote) supply.
//!
//! Bundled default blessings merged with user-imported text files, bucketed
//! by length. The safe area's relative size picks which bucket to draw from,
//! independently of how long the eventually chosen line is.

use rand::prelude::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::SafeArea;

/// Length bucket of a blessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthClass {
    Short,
    Medium,
    Long,
}

/// One blessing line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blessing {
    pub id: String,
    #[serde(default)]
    pub category: String,
    pub text: String,
    pub length: LengthClass,
}

impl Blessing {
    pub fn new(id: &str, category: &str, text: &str) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            text: text.into(),
            length: classify_length(text),
        }
    }
}

/// Classify a text by character count with whitespace stripped.
pub fn classify_length(text: &str) -> LengthClass {
    let len = text.chars().filter(|ch| !ch.is_whitespace()).count();
    if len <= 14 {
        LengthClass::Short
    } else if len <= 28 {
        LengthClass::Medium
    } else {
        LengthClass::Long
    }
}

/// Pick the length bucket a safe area has room for.
pub fn length_for_area(safe_area: &SafeArea) -> LengthClass {
    let ratio = safe_area.area_ratio();
    if ratio > 0.5 {
        LengthClass::Long
    } else if ratio > 0.35 {
        LengthClass::Medium
    } else {
        LengthClass::Short
    }
}

/// Bundled default blessings.
pub fn default_blessings() -> Vec<Blessing> {
    [
        ("b-001", "general", "早安！美好的一天開始了"),
        ("b-002", "general", "早上好！願你今天心情愉快，萬事順利"),
        (
            "b-003",
            "general",
            "新的一天，新的開始。帶著微笑迎接每一個可能，願陽光照亮你的每一步",
        ),
        ("b-004", "health", "健康是最大的財富"),
        ("b-005", "health", "照顧好自己身心靈，今天也要過得健康快樂"),
        (
            "b-006",
            "health",
            "身體健康是最大的福氣，願你每天都有充足的精力與好心情",
        ),
        ("b-007", "motivation", "今天也要加油！"),
        ("b-008", "motivation", "保持積極的心態相信自己的能力，你一定可以做到"),
        (
            "b-009",
            "motivation",
            "每一次努力都是成長的痕跡，相信自己，勇敢邁出每一步，明天會更好",
        ),
        ("b-010", "general", "早安，平安是福"),
        ("b-011", "general", "用一顆感恩的心，迎接美好的早晨"),
        ("b-012", "general", "清晨的陽光喚醒大地，也喚醒我們心中的希望與夢想"),
        ("b-013", "motivation", "活在當下，珍惜現在"),
        ("b-014", "motivation", "每天進步一点点，就是最大的成功"),
        ("b-015", "motivation", "失敗只是成功的過程，保持信念繼續前進，終會看到彩虹"),
    ]
    .iter()
    .map(|(id, category, text)| Blessing::new(id, category, text))
    .collect()
}

/// Placeholder strings that sometimes leak into imported quote files.
const IMPORT_REJECT_MARKERS: [&str; 2] = ["載入失敗", "暫無語錄"];

/// Parse an imported quote file into blessing texts.
///
/// `.txt` files contribute one blessing per non-blank line. Anything else is
/// treated as CSV: the header row is skipped and the first comma-separated
/// field of each row is taken, with surrounding quotes stripped.
pub fn parse_import(file_name: &str, raw: &str) -> Vec<String> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if file_name.ends_with(".txt") {
        return lines.into_iter().map(str::to_string).collect();
    }

    lines
        .into_iter()
        .skip(1)
        .filter_map(|line| {
            let field = line.split(',').next()?;
            let cleaned = field.trim_matches(|c| c == '"' || c == '\'').trim();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_string())
            }
        })
        .collect()
}

/// Turn imported texts into blessings, deduplicating against everything seen
/// so far and dropping placeholder/error strings.
pub fn import_blessings(file_name: &str, raw: &str, existing: &[Blessing]) -> Vec<Blessing> {
    let mut seen: std::collections::HashSet<String> =
        existing.iter().map(|b| b.text.clone()).collect();
    let mut imported = Vec::new();

    for (index, text) in parse_import(file_name, raw).into_iter().enumerate() {
        let trimmed = text.trim();
        if trimmed.is_empty() || IMPORT_REJECT_MARKERS.iter().any(|m| trimmed.contains(m)) {
            continue;
        }
        if !seen.insert(trimmed.to_string()) {
            continue;
        }
        imported.push(Blessing {
            id: format!("wf-{}-{}", file_name, index),
            category: "imported".into(),
            text: trimmed.to_string(),
            length: classify_length(trimmed),
        });
    }

    imported
}

/// Defaults plus imports, filtered to one length bucket.
pub fn merged_by_length(
    defaults: &[Blessing],
    imported: &[Blessing],
    length: LengthClass,
) -> Vec<Blessing> {
    defaults
        .iter()
        .chain(imported.iter())
        .filter(|b| b.length == length)
        .cloned()
        .collect()
}

/// Pick a random blessing, avoiding recently used ids when possible.
pub fn pick_random<'a, R: Rng>(
    blessings: &'a [Blessing],
    exclude_ids: &[String],
    rng: &mut R,
) -> Option<&'a Blessing> {
    let fresh: Vec<&Blessing> = blessings
        .iter()
        .filter(|b| !exclude_ids.contains(&b.id))
        .collect();
    if fresh.is_empty() {
        blessings.choose(rng)
    } else {
        fresh.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn classify_strips_whitespace() {
        assert_eq!(classify_length("早安！美好的一天開始了"), LengthClass::Short);
        assert_eq!(classify_length("早 安 ！ 美 好 的 一 天 開 始 了"), LengthClass::Short);
        assert_eq!(
            classify_length("早上好！願你今天心情愉快，萬事順利"),
            LengthClass::Medium
        );
        assert_eq!(classify_length(&"願".repeat(29)), LengthClass::Long);
    }

    #[test]
    fn length_boundaries_are_inclusive() {
        assert_eq!(classify_length(&"安".repeat(14)), LengthClass::Short);
        assert_eq!(classify_length(&"安".repeat(15)), LengthClass::Medium);
        assert_eq!(classify_length(&"安".repeat(28)), LengthClass::Medium);
    }

    #[test]
    fn area_ratio_selects_bucket() {
        let default_area = SafeArea::default(); // 0.8 × 0.7 = 0.56
        assert_eq!(length_for_area(&default_area), LengthClass::Long);
        let narrow = SafeArea {
            x: 0.2,
            y: 0.3,
            width: 0.6,
            height: 0.5,
        };
        assert_eq!(length_for_area(&narrow), LengthClass::Short);
    }

    #[test]
    fn defaults_cover_every_bucket() {
        let defaults = default_blessings();
        for length in [LengthClass::Short, LengthClass::Medium, LengthClass::Long] {
            assert!(defaults.iter().any(|b| b.length == length));
        }
    }

    #[test]
    fn txt_import_takes_every_line() {
        let texts = parse_import("問候.txt", "早安\n\n加油\n");
        assert_eq!(texts, vec!["早安", "加油"]);
    }

    #[test]
    fn csv_import_skips_header_and_takes_first_field() {
        let texts = parse_import("名言.csv", "text,author\n\"活在當下\",佚名\n珍惜現在,無名\n");
        assert_eq!(texts, vec!["活在當下", "珍惜現在"]);
    }

    #[test]
    fn import_drops_placeholders_and_duplicates() {
        let defaults = default_blessings();
        let raw = "早安！美好的一天開始了\n載入失敗，請重試\n全新的問候\n全新的問候";
        let imported = import_blessings("extra.txt", raw, &defaults);
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].text, "全新的問候");
    }

    #[test]
    fn pick_random_avoids_excluded_ids() {
        let blessings = default_blessings();
        let exclude: Vec<String> = blessings[..14].iter().map(|b| b.id.clone()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_random(&blessings, &exclude, &mut rng).unwrap();
        assert_eq!(picked.id, "b-015");
    }

    #[test]
    fn pick_random_falls_back_when_everything_excluded() {
        let blessings = default_blessings();
        let exclude: Vec<String> = blessings.iter().map(|b| b.id.clone()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_random(&blessings, &exclude, &mut rng).is_some());
    }
}
