//! Case-study personas for role-played rehearsal
//!
//! Each case study pairs a system instruction (who the counterpart is and
//! how they behave) with a fixed synthesis voice. The catalog is closed and
//! read-only: ids resolve once at session creation, and unknown ids fall
//! back to the default case study rather than failing the turn.

/// Built-in case studies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStudy {
    /// "template1": Dr. Jennifer Walker, a time-pressed major-gift prospect
    Template1,
    /// "template2": fill-in interview scaffold
    Template2,
    /// "template3": fill-in interview scaffold
    Template3,
}

impl CaseStudy {
    /// Case study used when the caller supplies no id or an unknown one
    pub const DEFAULT: Self = Self::Template1;

    /// All built-in case studies, in catalog order
    pub const ALL: [Self; 3] = [Self::Template1, Self::Template2, Self::Template3];

    /// Resolve a case-study id, falling back to [`Self::DEFAULT`]
    #[must_use]
    pub fn resolve(id: &str) -> Self {
        match id.trim() {
            "template2" => Self::Template2,
            "template3" => Self::Template3,
            _ => Self::DEFAULT,
        }
    }

    /// Stable identifier used on the wire and in URLs
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Template1 => "template1",
            Self::Template2 => "template2",
            Self::Template3 => "template3",
        }
    }

    /// The persona this case study plays
    #[must_use]
    pub const fn persona(self) -> &'static Persona {
        match self {
            Self::Template1 => &TEMPLATE1,
            Self::Template2 => &TEMPLATE2,
            Self::Template3 => &TEMPLATE3,
        }
    }
}

impl std::fmt::Display for CaseStudy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A role-play persona: instruction text plus synthesis voice
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    /// Display name shown to the rehearsing user
    pub name: &'static str,
    /// System instruction seeding every session with this persona
    pub system_prompt: &'static str,
    /// Fixed voice used to render this persona's replies
    pub voice: VoiceProfile,
}

/// Voice identity and rendering parameters for speech synthesis
#[derive(Debug, Clone, Copy)]
pub struct VoiceProfile {
    /// Provider voice identifier
    pub voice_id: &'static str,
    /// Rendering stability (0.0..=1.0)
    pub stability: f32,
    /// Similarity boost (0.0..=1.0)
    pub similarity_boost: f32,
}

/// "Alice", the shared default voice across the built-in catalog
const ALICE: VoiceProfile = VoiceProfile {
    voice_id: "Xb7hH8MSUJpSbSDYk0k2",
    stability: 0.6,
    similarity_boost: 0.85,
};

const TEMPLATE1: Persona = Persona {
    name: "Dr. Jennifer Walker",
    system_prompt: "You are Dr. Jennifer Walker, a 55-year-old African American Biology \
Professor at the University of Hawaii, Honolulu. You hold a PhD in Genetics and Genomics \
from CalTech, an MS in Molecular Biology from Harvard, and a BS in Biology from UT Austin. \
You previously worked in private industry and hold lucrative gene patents. You're married \
to Fabio, a surf instructor, and have an adopted daughter from Somalia named Margaret \
who's in her mid-20s with an interest in art. \
You're easily distracted because you manage many responsibilities. You're not open to \
casual chatter and will try to quickly end conversations that aren't interesting or \
important. You're often checking your phone. You appreciate professionalism and respect \
for your time. You have no patience for overly personal or casual approaches - maintain \
professional distance. \
You love animals (you have a Rottweiler), the outdoors, sailing, sea life, and surfing \
competitions. You dislike crowded places and soda. You've given to conservation and human \
rights causes in the past. Your Twitter likes show aquatic animals. \
Keep responses brief (1-2 sentences max) and business-like. Show mild impatience if the \
pitch lacks focus or wastes time. Ask direct, pointed questions about impact, budget, and \
outcomes. If someone tries to be overly casual or personal, become noticeably less \
engaged. Show interest when they mention conservation, marine life, human rights, or \
demonstrate clear metrics and professionalism. \
You want to see: (1) Clear, measurable impact (especially conservation or human rights \
related), (2) Respect for your time with concise communication, (3) Professional tone, \
(4) Specific budget and outcomes, (5) Regular updates and accountability. \
You'll disengage if they: waste time with small talk, are vague about impact, lack \
financial clarity, try to be too familiar or casual, or don't have a clear ask. \
Start by politely asking about their work and its purpose, while keeping it focused. If \
they're focused and professional, ask about measurable outcomes. Then probe on budget and \
sustainability. If they maintain professionalism and show clear impact, ask how you'd be \
kept informed. Show subtle interest if they mention marine conservation, animal welfare, \
or human rights.",
    voice: ALICE,
};

const TEMPLATE2: Persona = Persona {
    name: "Case Study Template 2",
    system_prompt: "You are a [ROLE] interviewing a [SUBJECT]. \
Focus on [KEY TOPICS]. \
Be [TONE]. Keep responses [LENGTH].",
    voice: ALICE,
};

const TEMPLATE3: Persona = Persona {
    name: "Case Study Template 3",
    system_prompt: "You are a [ROLE] interviewing a [SUBJECT]. \
Ask about [KEY TOPICS]. \
Balance [ASPECT 1] with [ASPECT 2]. Keep responses [LENGTH].",
    voice: ALICE,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve() {
        assert_eq!(CaseStudy::resolve("template1"), CaseStudy::Template1);
        assert_eq!(CaseStudy::resolve("template2"), CaseStudy::Template2);
        assert_eq!(CaseStudy::resolve("template3"), CaseStudy::Template3);
    }

    #[test]
    fn unknown_id_falls_back_to_default() {
        assert_eq!(CaseStudy::resolve("saas"), CaseStudy::DEFAULT);
        assert_eq!(CaseStudy::resolve(""), CaseStudy::DEFAULT);
        assert_eq!(CaseStudy::resolve("  template2  "), CaseStudy::Template2);
    }

    #[test]
    fn personas_carry_prompt_and_voice() {
        for case_study in CaseStudy::ALL {
            let persona = case_study.persona();
            assert!(!persona.system_prompt.is_empty());
            assert!(!persona.voice.voice_id.is_empty());
        }
        assert_eq!(
            CaseStudy::Template1.persona().name,
            "Dr. Jennifer Walker"
        );
    }
}
