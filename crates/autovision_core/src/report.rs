//! Turns a [`PredictionResult`] into a display-ready report.
//!
//! Everything here is pure: the desktop shell paints the [`Report`] and
//! nothing else reads it. Rounding happens once, when the report is built,
//! so the painted labels and the tier colouring always agree.

use crate::catalog::{self, SpecDescriptor};
use crate::prediction::{PredictionResult, SpecEntry, SpecValue};
use std::fmt;
use std::time::Duration;

/// Above this magnitude a displacement is taken to be in cubic centimetres.
///
/// The payload carries no unit for displacement. Litre figures for road
/// cars stay well under 20 and cc figures stay well above it, so the
/// magnitude is used as the unit. Replace this if the service starts
/// sending explicit units.
pub const DISPLACEMENT_CC_THRESHOLD: f64 = 20.0;

/// Provenance shown when the service does not name a source.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Default delay between consecutive card reveals.
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(50);

/// A percentage rounded to a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percent {
    /// Already rounded.
    pub value: f64,
    decimals: usize,
}

impl Percent {
    /// Convert a fraction in [0,1] to a percentage rounded to `decimals`.
    pub fn from_fraction(fraction: f64, decimals: usize) -> Self {
        Self {
            value: round_half_away(fraction * 100.0, decimals),
            decimals,
        }
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}%", self.decimals, self.value)
    }
}

/// Three-way classification of the headline confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// An sRGB colour with straight alpha in [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Badge colours for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPalette {
    pub background: Rgba,
    pub border: Rgba,
    pub text: Rgba,
}

impl ConfidenceTier {
    /// Classify a headline percentage. First match wins: 80, then 60.
    pub fn classify(percent: f64) -> Self {
        if percent >= 80.0 {
            ConfidenceTier::High
        } else if percent >= 60.0 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn palette(self) -> TierPalette {
        let (r, g, b) = match self {
            ConfidenceTier::High => (16, 185, 129),
            ConfidenceTier::Medium => (245, 158, 11),
            ConfidenceTier::Low => (239, 68, 68),
        };
        TierPalette {
            background: Rgba::new(r, g, b, 0.1),
            border: Rgba::new(r, g, b, 0.3),
            text: Rgba::new(r, g, b, 1.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceTier::High => "High confidence",
            ConfidenceTier::Medium => "Medium confidence",
            ConfidenceTier::Low => "Low confidence",
        }
    }
}

/// A labelled progress bar for one identification axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBar {
    pub percent: Percent,
    /// Bar fill in [0,1].
    pub fill: f32,
}

impl ConfidenceBar {
    fn new(confidence: f64, decimals: usize) -> Self {
        let percent = Percent::from_fraction(confidence, decimals);
        Self {
            fill: fill_fraction(percent.value),
            percent,
        }
    }
}

/// One rendered specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCard {
    /// Key as it appeared in the payload.
    pub key: String,
    pub descriptor: SpecDescriptor,
    /// Value after unit normalization, before rounding.
    pub value: SpecValue,
    /// Rounded value with the unit suffix, e.g. `1.4 L`.
    pub display_value: String,
    pub source: String,
    pub confidence: ConfidenceBar,
    /// Time after the report appears at which this card is revealed.
    pub reveal_after: Duration,
}

/// Display-ready report for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub name: String,
    pub year: String,
    pub headline: Percent,
    pub tier: ConfidenceTier,
    pub model_bar: ConfidenceBar,
    pub year_bar: ConfidenceBar,
    pub cards: Vec<SpecCard>,
    pub inference_note: Option<String>,
}

impl Report {
    /// Build the report with the default card stagger.
    pub fn render(payload: &PredictionResult) -> Self {
        Self::render_with_stagger(payload, DEFAULT_STAGGER)
    }

    pub fn render_with_stagger(payload: &PredictionResult, stagger: Duration) -> Self {
        let headline = headline_confidence(payload.confidence.model, payload.confidence.year);
        let cards = payload
            .specifications
            .iter()
            .enumerate()
            .map(|(idx, (key, entry))| {
                let mut card = render_card(key, entry);
                card.reveal_after = stagger.saturating_mul(idx as u32);
                card
            })
            .collect();

        Self {
            name: format_name(&payload.subject),
            year: payload.year.to_string(),
            tier: ConfidenceTier::classify(headline.value),
            headline,
            model_bar: ConfidenceBar::new(payload.confidence.model, 1),
            year_bar: ConfidenceBar::new(payload.confidence.year, 1),
            cards,
            inference_note: payload
                .inference_note
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .cloned(),
        }
    }

    /// Number of cards visible `elapsed` after the report appeared.
    pub fn revealed_cards(&self, elapsed: Duration) -> usize {
        self.cards
            .iter()
            .take_while(|c| c.reveal_after <= elapsed)
            .count()
    }

    /// Plain-text rendering for the clipboard.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} ({})\nConfidence: {} ({})\nModel: {}  Year: {}\n",
            self.name,
            self.year,
            self.headline,
            self.tier.label(),
            self.model_bar.percent,
            self.year_bar.percent,
        );
        for card in &self.cards {
            out.push_str(&format!(
                "{}: {} [{}, {}]\n",
                card.descriptor.label, card.display_value, card.source, card.confidence.percent
            ));
        }
        out
    }
}

/// `Audi_A4_Sedan_2012` → `Audi A4 Sedan`.
///
/// Four-digit tokens are treated as years and dropped wherever they occur.
/// A subject that is only a year yields an empty string.
pub fn format_name(subject: &str) -> String {
    subject
        .split('_')
        .filter(|token| !is_year_token(token))
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Mean of the two axis confidences as a percentage with one decimal.
pub fn headline_confidence(model: f64, year: f64) -> Percent {
    Percent::from_fraction((model + year) / 2.0, 1)
}

/// Express an engine displacement in litres.
///
/// See [`DISPLACEMENT_CC_THRESHOLD`]; this is a heuristic, not a unit
/// detector.
pub fn normalize_displacement_litres(value: f64) -> f64 {
    if value > DISPLACEMENT_CC_THRESHOLD {
        value / 1000.0
    } else {
        value
    }
}

/// Render one specification entry.
pub fn render_card(key: &str, entry: &SpecEntry) -> SpecCard {
    let (descriptor, value) = match entry.value.as_number() {
        Some(n) if catalog::is_displacement_key(key) => (
            catalog::DISPLACEMENT,
            SpecValue::Number(normalize_displacement_litres(n)),
        ),
        _ => (catalog::describe(key), entry.value.clone()),
    };

    let mut display_value = format_value(&value);
    if !descriptor.unit.is_empty() {
        display_value.push(' ');
        display_value.push_str(descriptor.unit);
    }

    let source = entry
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string();

    SpecCard {
        key: key.to_string(),
        descriptor,
        value,
        display_value,
        source,
        confidence: ConfidenceBar::new(entry.confidence, 0),
        reveal_after: Duration::ZERO,
    }
}

fn format_value(value: &SpecValue) -> String {
    match value {
        SpecValue::Number(n) => format!("{:.1}", round_half_away(*n, 1)),
        SpecValue::Text(s) => s.clone(),
        SpecValue::Other(v) => v.to_string(),
    }
}

/// Round to `decimals` places with ties going away from zero.
///
/// The formatter alone rounds ties to even, so `2.25` would print as `2.2`.
pub fn round_half_away(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

fn fill_fraction(percent: f64) -> f32 {
    if percent.is_finite() {
        (percent / 100.0).clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SpecIcon;
    use crate::prediction::{AxisConfidence, Specifications, YearValue};
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn entry(value: SpecValue, confidence: f64, source: Option<&str>) -> SpecEntry {
        SpecEntry {
            value,
            confidence,
            source: source.map(str::to_string),
        }
    }

    fn payload(specs: Vec<(&str, SpecEntry)>) -> PredictionResult {
        PredictionResult {
            subject: "Audi_A4_Sedan_2012".into(),
            year: YearValue::Number(2012),
            confidence: AxisConfidence {
                model: 0.92,
                year: 0.81,
            },
            specifications: specs
                .into_iter()
                .map(|(k, e)| (k.to_string(), e))
                .collect::<Specifications>(),
            inference_note: None,
        }
    }

    #[rstest]
    #[case("Audi_A4_Sedan_2012", "Audi A4 Sedan")]
    #[case("Tesla_Model_S", "Tesla Model S")]
    #[case("2012_Audi_A4", "Audi A4")]
    #[case("BMW_x5_SUV", "Bmw X5 Suv")]
    #[case("Ford_F150_12345", "Ford F150 12345")]
    #[case("2012", "")]
    fn formats_subject_names(#[case] subject: &str, #[case] expected: &str) {
        assert_eq!(format_name(subject), expected);
    }

    #[test]
    fn headline_is_mean_of_axes() {
        let headline = headline_confidence(0.92, 0.81);
        assert_eq!(headline.to_string(), "86.5%");
        assert_relative_eq!(headline.value, 86.5);
    }

    #[rstest]
    #[case(80.0, ConfidenceTier::High)]
    #[case(100.0, ConfidenceTier::High)]
    #[case(79.9, ConfidenceTier::Medium)]
    #[case(60.0, ConfidenceTier::Medium)]
    #[case(59.9, ConfidenceTier::Low)]
    #[case(0.0, ConfidenceTier::Low)]
    fn tiers_are_boundary_exact(#[case] percent: f64, #[case] tier: ConfidenceTier) {
        assert_eq!(ConfidenceTier::classify(percent), tier);
    }

    #[test]
    fn tier_uses_the_rounded_headline() {
        // 79.96 displays as 80.0 and must be coloured as such
        let mut p = payload(vec![]);
        p.confidence = AxisConfidence {
            model: 0.7996,
            year: 0.7996,
        };
        let report = Report::render(&p);
        assert_eq!(report.headline.to_string(), "80.0%");
        assert_eq!(report.tier, ConfidenceTier::High);
    }

    #[test]
    fn tier_palettes_differ() {
        let high = ConfidenceTier::High.palette();
        let medium = ConfidenceTier::Medium.palette();
        let low = ConfidenceTier::Low.palette();
        assert_ne!(high, medium);
        assert_ne!(medium, low);
        assert_relative_eq!(high.background.a, 0.1);
        assert_relative_eq!(low.border.a, 0.3);
    }

    #[test]
    fn axis_bars_keep_one_decimal_and_cards_round_to_whole_percent() {
        let mut p = payload(vec![("bhp", entry(SpecValue::Number(150.0), 0.873, None))]);
        p.confidence.model = 0.873;
        let report = Report::render(&p);
        assert_eq!(report.model_bar.percent.to_string(), "87.3%");
        assert_relative_eq!(report.model_bar.fill, 0.873, epsilon = 1e-6);
        assert_eq!(report.cards[0].confidence.percent.to_string(), "87%");
        assert_relative_eq!(report.cards[0].confidence.fill, 0.87, epsilon = 1e-6);
    }

    #[test]
    fn cc_displacement_is_converted_to_litres() {
        let card = render_card("displacement", &entry(SpecValue::Number(1390.0), 1.0, None));
        assert_eq!(card.descriptor, catalog::DISPLACEMENT);
        match card.value {
            SpecValue::Number(v) => assert_relative_eq!(v, 1.39, epsilon = 1e-9),
            other => panic!("expected number, got {other:?}"),
        }
        assert_eq!(card.display_value, "1.4 L");
    }

    #[test]
    fn litre_displacement_is_left_alone() {
        let card = render_card("displacement_l", &entry(SpecValue::Number(2.0), 1.0, None));
        assert_eq!(card.value, SpecValue::Number(2.0));
        assert_eq!(card.display_value, "2.0 L");
        assert_eq!(card.descriptor.label, "Displacement");
    }

    #[test]
    fn textual_displacement_is_not_normalized() {
        let card = render_card(
            "displacement",
            &entry(SpecValue::Text("1390 cc".into()), 0.5, Some("Gemma")),
        );
        assert_eq!(card.display_value, "1390 cc L");
    }

    #[rstest]
    #[case(0.5, 0.5)]
    #[case(20.0, 20.0)]
    #[case(20.5, 0.0205)]
    #[case(4999.0, 4.999)]
    fn displacement_threshold(#[case] input: f64, #[case] litres: f64) {
        assert_relative_eq!(normalize_displacement_litres(input), litres, epsilon = 1e-9);
    }

    #[test]
    fn unknown_key_renders_with_raw_label() {
        let card = render_card("wheelbase", &entry(SpecValue::Number(2808.0), 0.6, None));
        assert_eq!(card.descriptor.label, "wheelbase");
        assert_eq!(card.descriptor.icon, SpecIcon::Generic);
        assert_eq!(card.display_value, "2808.0");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    fn missing_source_reads_unknown(#[case] source: Option<&str>) {
        let card = render_card("gearbox", &entry(SpecValue::Text("Manual".into()), 0.7, source));
        assert_eq!(card.source, "Unknown");
        assert_eq!(card.display_value, "Manual");
    }

    #[test]
    fn unit_suffix_and_numeric_rounding() {
        let card = render_card("bhp", &entry(SpecValue::Number(208.0), 0.85, Some("Gemma")));
        assert_eq!(card.display_value, "208.0 BHP");
        assert_eq!(card.source, "Gemma");
        let card = render_card("cylinders", &entry(SpecValue::Number(4.0), 0.9, None));
        assert_eq!(card.display_value, "4.0");
    }

    #[test]
    fn cards_follow_payload_order_with_stagger() {
        let p = payload(vec![
            ("seats", entry(SpecValue::Number(5.0), 1.0, None)),
            ("displacement", entry(SpecValue::Number(1984.0), 1.0, None)),
            ("fuel", entry(SpecValue::Text("Petrol".into()), 0.7, None)),
        ]);
        let report = Report::render(&p);
        let keys: Vec<&str> = report.cards.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["seats", "displacement", "fuel"]);
        assert_eq!(report.cards[2].reveal_after, Duration::from_millis(100));
        assert_eq!(report.revealed_cards(Duration::ZERO), 1);
        assert_eq!(report.revealed_cards(Duration::from_millis(60)), 2);
        assert_eq!(report.revealed_cards(Duration::from_secs(1)), 3);
    }

    #[test]
    fn out_of_range_scores_do_not_break_bars() {
        let card = render_card("bhp", &entry(SpecValue::Number(1.0), 1.7, None));
        assert_eq!(card.confidence.percent.to_string(), "170%");
        assert_relative_eq!(card.confidence.fill, 1.0);
    }

    #[rstest]
    #[case("displacement", 2250.0, "2.3 L")]
    #[case("displacement_l", 1.25, "1.3 L")]
    #[case("displacement", 1390.0, "1.4 L")]
    #[case("bhp", 187.45, "187.5 BHP")]
    fn numeric_ties_round_up(#[case] key: &str, #[case] value: f64, #[case] expected: &str) {
        let card = render_card(key, &entry(SpecValue::Number(value), 1.0, None));
        assert_eq!(card.display_value, expected);
    }

    #[rstest]
    #[case(0.625, 0, "63%")]
    #[case(0.125, 0, "13%")]
    #[case(0.0125, 1, "1.3%")]
    #[case(0.864, 1, "86.4%")]
    fn percent_ties_round_up(#[case] fraction: f64, #[case] decimals: usize, #[case] expected: &str) {
        assert_eq!(Percent::from_fraction(fraction, decimals).to_string(), expected);
    }

    #[test]
    fn card_confidence_tie_rounds_up() {
        let card = render_card("seats", &entry(SpecValue::Number(5.0), 0.625, None));
        assert_eq!(card.confidence.percent.to_string(), "63%");
        assert_relative_eq!(card.confidence.fill, 0.63, epsilon = 1e-6);
    }

    #[test]
    fn summary_lists_every_card() {
        let p = payload(vec![("bhp", entry(SpecValue::Number(208.0), 0.85, Some("Gemma")))]);
        let summary = Report::render(&p).summary();
        assert!(summary.starts_with("Audi A4 Sedan (2012)\nConfidence: 86.5% (High confidence)"));
        assert!(summary.contains("Power: 208.0 BHP [Gemma, 85%]"));
    }
}
