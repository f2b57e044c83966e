//! The agent task graph: which role consumes which artifact.
//!
//! Nodes are declared with typed inputs and outputs; edges are derived by
//! matching an input kind to the node that produces it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobStage;
use crate::models::{FinalVideo, GeneratedStory, MediaClip, Script, Segment, Story, VoiceOver};

/// Kind of value flowing along an edge of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Story,
    GeneratedStory,
    Script,
    VoiceOver,
    Candidates,
    Timeline,
    FinalVideo,
}

/// A produced value, tagged by kind.
#[derive(Debug, Clone)]
pub enum Artifact {
    Story(Story),
    GeneratedStory(GeneratedStory),
    Script(Script),
    VoiceOver(VoiceOver),
    Candidates {
        segment_id: String,
        clips: Vec<MediaClip>,
    },
    Timeline(Vec<Segment>),
    FinalVideo(FinalVideo),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Story(_) => ArtifactKind::Story,
            Artifact::GeneratedStory(_) => ArtifactKind::GeneratedStory,
            Artifact::Script(_) => ArtifactKind::Script,
            Artifact::VoiceOver(_) => ArtifactKind::VoiceOver,
            Artifact::Candidates { .. } => ArtifactKind::Candidates,
            Artifact::Timeline(_) => ArtifactKind::Timeline,
            Artifact::FinalVideo(_) => ArtifactKind::FinalVideo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StoryWriter,
    ScriptArchitect,
    VoiceSelector,
    MediaResearcher,
    MediaCurator,
    Assembler,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::StoryWriter => "story writer",
            Role::ScriptArchitect => "script architect",
            Role::VoiceSelector => "voice selector",
            Role::MediaResearcher => "media researcher",
            Role::MediaCurator => "media curator",
            Role::Assembler => "assembler",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskNode {
    pub role: Role,
    /// Tracked stage whose job runs this node.
    pub stage: JobStage,
    pub inputs: Vec<ArtifactKind>,
    pub output: ArtifactKind,
    /// Runs once per segment instead of once per subject.
    pub per_segment: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("No node produces {kind:?}, needed by the {role}")]
    MissingProducer { role: Role, kind: ArtifactKind },

    #[error("Task graph contains a cycle through: {}", join_roles(.roles))]
    Cycle { roles: Vec<Role> },
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(
        mut self,
        role: Role,
        stage: JobStage,
        inputs: &[ArtifactKind],
        output: ArtifactKind,
        per_segment: bool,
    ) -> Self {
        self.nodes.push(TaskNode {
            role,
            stage,
            inputs: inputs.to_vec(),
            output,
            per_segment,
        });
        self
    }

    /// The pipeline as it runs: story, script, voice-over, then research
    /// and curation per segment, then assembly.
    pub fn standard() -> Self {
        use ArtifactKind as K;
        TaskGraph::new()
            .node(Role::StoryWriter, JobStage::Story, &[K::Story], K::GeneratedStory, false)
            .node(
                Role::ScriptArchitect,
                JobStage::Script,
                &[K::Story, K::GeneratedStory],
                K::Script,
                false,
            )
            .node(Role::VoiceSelector, JobStage::VoiceOver, &[K::Script], K::VoiceOver, false)
            .node(
                Role::MediaResearcher,
                JobStage::Media,
                &[K::Script, K::VoiceOver],
                K::Candidates,
                true,
            )
            .node(Role::MediaCurator, JobStage::Media, &[K::Candidates], K::Timeline, true)
            .node(
                Role::Assembler,
                JobStage::Video,
                &[K::VoiceOver, K::Timeline],
                K::FinalVideo,
                false,
            )
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Nodes in dependency order (Kahn's algorithm, declaration order on
    /// ties). Inputs nobody produces must be `external` (given by the
    /// caller).
    pub fn topological_order(&self, external: &[ArtifactKind]) -> Result<Vec<&TaskNode>, GraphError> {
        let producers: HashMap<ArtifactKind, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.output, i))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for kind in &node.inputs {
                match producers.get(kind) {
                    Some(&producer) => {
                        in_degree[i] += 1;
                        dependents[producer].push(i);
                    }
                    None if external.contains(kind) => {}
                    None => {
                        return Err(GraphError::MissingProducer {
                            role: node.role,
                            kind: *kind,
                        })
                    }
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(i) = ready.pop_front() {
            order.push(&self.nodes[i]);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let roles = (0..self.nodes.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.nodes[i].role)
                .collect();
            return Err(GraphError::Cycle { roles });
        }
        Ok(order)
    }

    /// Tracked stages in the order they must run, each listed once.
    pub fn stage_order(&self, external: &[ArtifactKind]) -> Result<Vec<JobStage>, GraphError> {
        let mut stages: Vec<JobStage> = Vec::new();
        for node in self.topological_order(external)? {
            if !stages.contains(&node.stage) {
                stages.push(node.stage);
            }
        }
        Ok(stages)
    }
}
