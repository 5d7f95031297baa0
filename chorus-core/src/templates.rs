//! Catalog of the preset scenarios the server can build.
//!
//! The server is authoritative: the registry forwards any key, and this list
//! only exists so front ends can show what is available without a round trip.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSeed {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioTemplate {
    pub key: &'static str,
    pub description: &'static str,
    pub agents: &'static [AgentSeed],
}

const TEMPLATES: &[ScenarioTemplate] = &[
    ScenarioTemplate {
        key: "debate",
        description: "Two agents debate a topic, and one aims to persuade the other.",
        agents: &[
            AgentSeed {
                name: "Alex",
                role: "Pro side",
                goal: "Argue in favor of the topic.",
            },
            AgentSeed {
                name: "Blake",
                role: "Con side",
                goal: "Argue against the topic.",
            },
        ],
    },
    ScenarioTemplate {
        key: "startup_planning",
        description: "A startup team discusses features for an MVP product.",
        agents: &[
            AgentSeed {
                name: "Ava",
                role: "CEO",
                goal: "Define the vision and priorities.",
            },
            AgentSeed {
                name: "Ben",
                role: "Engineer",
                goal: "Simplify scope and estimate effort.",
            },
            AgentSeed {
                name: "Mia",
                role: "PM",
                goal: "Align business goals and technical constraints.",
            },
        ],
    },
    ScenarioTemplate {
        key: "story_writing",
        description: "Writers collaborate to create a short story idea.",
        agents: &[
            AgentSeed {
                name: "Luna",
                role: "Author",
                goal: "Generate creative story ideas.",
            },
            AgentSeed {
                name: "Eli",
                role: "Editor",
                goal: "Improve clarity and coherence.",
            },
        ],
    },
    ScenarioTemplate {
        key: "argument_short",
        description: "Two people in a heated argument. Very short, blunt replies.",
        agents: &[
            AgentSeed {
                name: "Riley",
                role: "Arguer A",
                goal: "Win the argument with blunt, snappy points.",
            },
            AgentSeed {
                name: "Jordan",
                role: "Arguer B",
                goal: "Shut down A's points with sharp rebuttals.",
            },
        ],
    },
];

impl ScenarioTemplate {
    pub fn all() -> &'static [ScenarioTemplate] {
        TEMPLATES
    }

    pub fn find(key: &str) -> Option<&'static ScenarioTemplate> {
        let key = key.trim();
        TEMPLATES.iter().find(|t| t.key == key)
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|t| t.key)
    }
}
