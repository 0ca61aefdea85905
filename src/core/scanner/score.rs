// src/core/scanner/score.rs

use crate::core::models::{CategorizedFindings, ScoreBreakdown};

pub const BASE_SCORE: i32 = 100;
pub const TRACKER_PENALTY: i32 = 25;
pub const GOOGLE_PENALTY: i32 = 20;
pub const CRITICAL_PENALTY: i32 = 20;
pub const EXTERNAL_PENALTY: i32 = 10;
pub const CONSENT_BONUS: i32 = 10;

/// Deterministic compliance score over the final (dynamic-preferred)
/// categorized flags, clamped to `[0, 100]`, with every signed term exposed
/// for auditing.
pub fn compute_score(categorized: &CategorizedFindings) -> (u8, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        base: BASE_SCORE,
        minus_trackers: if categorized.trackers { TRACKER_PENALTY } else { 0 },
        minus_google: if categorized.google_tools { GOOGLE_PENALTY } else { 0 },
        minus_critical: if categorized.critical_tools { CRITICAL_PENALTY } else { 0 },
        minus_external: if categorized.external_files { EXTERNAL_PENALTY } else { 0 },
        plus_consent: if categorized.consent_present { CONSENT_BONUS } else { 0 },
    };

    let raw = breakdown.base
        - breakdown.minus_trackers
        - breakdown.minus_google
        - breakdown.minus_critical
        - breakdown.minus_external
        + breakdown.plus_consent;
    let score = raw.clamp(0, 100) as u8;

    (score, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(
        trackers: bool,
        google: bool,
        critical: bool,
        external: bool,
        consent: bool,
    ) -> CategorizedFindings {
        CategorizedFindings {
            tracking_cookies: trackers,
            trackers,
            google_tools: google,
            critical_tools: critical,
            external_files: external,
            consent_present: consent,
        }
    }

    #[test]
    fn clean_site_scores_hundred() {
        let (score, breakdown) = compute_score(&flags(false, false, false, false, false));
        assert_eq!(score, 100);
        assert_eq!(breakdown.base, 100);
        assert_eq!(breakdown.minus_trackers, 0);
    }

    #[test]
    fn consent_bonus_is_clamped_at_hundred() {
        let (score, _) = compute_score(&flags(false, false, false, false, true));
        assert_eq!(score, 100);
    }

    #[test]
    fn critical_tool_with_consent_nets_ninety() {
        // OneTrust-style page: the critical-tool penalty applies, the
        // consent bonus applies, both visible in the breakdown.
        let (score, breakdown) = compute_score(&flags(false, false, true, false, true));
        assert_eq!(score, 90);
        assert_eq!(breakdown.minus_critical, CRITICAL_PENALTY);
        assert_eq!(breakdown.plus_consent, CONSENT_BONUS);
    }

    #[test]
    fn formula_holds_for_every_flag_combination() {
        for bits in 0..32u8 {
            let trackers = bits & 1 != 0;
            let google = bits & 2 != 0;
            let critical = bits & 4 != 0;
            let external = bits & 8 != 0;
            let consent = bits & 16 != 0;

            let (score, breakdown) = compute_score(&flags(trackers, google, critical, external, consent));

            let expected = (100
                - if trackers { 25 } else { 0 }
                - if google { 20 } else { 0 }
                - if critical { 20 } else { 0 }
                - if external { 10 } else { 0 }
                + if consent { 10 } else { 0 })
            .clamp(0, 100);

            assert_eq!(score as i32, expected, "combination {bits:05b}");
            assert!((0..=100).contains(&score));

            let recomposed = breakdown.base - breakdown.minus_trackers - breakdown.minus_google
                - breakdown.minus_critical
                - breakdown.minus_external
                + breakdown.plus_consent;
            assert_eq!(recomposed.clamp(0, 100), score as i32);
        }
    }
}
