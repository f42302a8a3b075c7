use crate::models::RiskCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Neutral,
    Calm,
    Caution,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskPresentation {
    pub tier: RiskTier,
    pub emphasis: Emphasis,
    pub recommendation: &'static str,
}

const URGENT_RECOMMENDATION: &str =
    "Immediate medical attention recommended. Patient added to high priority queue.";
const ROUTINE_RECOMMENDATION: &str = "Standard monitoring protocol advised.";

/// Display band for a collaborator-supplied category. Every result panel goes
/// through here; HIGH and CRITICAL share the urgent treatment.
pub fn classify(risk_category: Option<&str>) -> RiskPresentation {
    let Some(category) = risk_category.and_then(RiskCategory::parse) else {
        return RiskPresentation {
            tier: RiskTier::Unknown,
            emphasis: Emphasis::Neutral,
            recommendation: "",
        };
    };

    let (tier, emphasis) = match category {
        RiskCategory::Low => (RiskTier::Low, Emphasis::Calm),
        RiskCategory::Medium => (RiskTier::Medium, Emphasis::Caution),
        RiskCategory::High => (RiskTier::High, Emphasis::Urgent),
        RiskCategory::Critical => (RiskTier::Critical, Emphasis::Urgent),
    };

    let recommendation = if category.is_urgent() {
        URGENT_RECOMMENDATION
    } else {
        ROUTINE_RECOMMENDATION
    };

    RiskPresentation {
        tier,
        emphasis,
        recommendation,
    }
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
            RiskTier::Unknown => "UNKNOWN",
        }
    }
}
