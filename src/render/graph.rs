//! Per-frame stage graph.
//!
//! Each stage declares the resources it reads and writes. The frame plan is
//! the topological order of the hazards between them (read-after-write,
//! write-after-read, write-after-write). The GPU backend records the plan
//! into one command encoder and submits it as a unit, so in-order execution
//! on a single queue is what makes each stage's writes visible to the next.

use std::fmt;

/// GPU resources touched by the frame stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Authoritative simulation grid
    GridCurrent,
    /// Scratch simulation grid
    GridScratch,
    /// Authoritative caustics texture
    Caustics,
    /// Scratch texture used between the two blur passes
    CausticsScratch,
    /// Presentation target
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    WaveUpdate,
    StateCopy,
    CausticsProjection,
    BlurHorizontal,
    BlurVertical,
    Composite,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::WaveUpdate => "wave update",
            Stage::StateCopy => "state copy",
            Stage::CausticsProjection => "caustics projection",
            Stage::BlurHorizontal => "blur (horizontal)",
            Stage::BlurVertical => "blur (vertical)",
            Stage::Composite => "composite",
        }
    }

    pub fn reads(&self) -> &'static [Resource] {
        use Resource::*;
        match self {
            Stage::WaveUpdate => &[GridCurrent],
            Stage::StateCopy => &[GridScratch],
            Stage::CausticsProjection => &[GridCurrent],
            Stage::BlurHorizontal => &[Caustics],
            Stage::BlurVertical => &[CausticsScratch],
            Stage::Composite => &[GridCurrent, Caustics],
        }
    }

    pub fn writes(&self) -> &'static [Resource] {
        use Resource::*;
        match self {
            Stage::WaveUpdate => &[GridScratch],
            Stage::StateCopy => &[GridCurrent],
            Stage::CausticsProjection => &[Caustics],
            Stage::BlurHorizontal => &[CausticsScratch],
            Stage::BlurVertical => &[Caustics],
            Stage::Composite => &[Surface],
        }
    }

    /// Whether `later` must run after `self` when both are in a frame and
    /// `self` was declared first.
    fn conflicts_with(&self, later: &Stage) -> bool {
        let raw = self.writes().iter().any(|r| later.reads().contains(r));
        let war = self.reads().iter().any(|r| later.writes().contains(r));
        let waw = self.writes().iter().any(|r| later.writes().contains(r));
        raw || war || waw
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stage order as declared by the pipeline.
fn declared_stages(blur_enabled: bool) -> Vec<Stage> {
    let mut stages = vec![
        Stage::WaveUpdate,
        Stage::StateCopy,
        Stage::CausticsProjection,
    ];
    if blur_enabled {
        stages.push(Stage::BlurHorizontal);
        stages.push(Stage::BlurVertical);
    }
    stages.push(Stage::Composite);
    stages
}

/// An ordering that violates a declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderViolation {
    pub before: Stage,
    pub after: Stage,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} must be recorded before {}", self.before, self.after)
    }
}

/// Ordered list of stages for one frame with their dependency edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    stages: Vec<Stage>,
    /// (from, to) pairs over `stages` indices
    edges: Vec<(usize, usize)>,
}

impl FramePlan {
    /// Build and topologically order the stages for one frame.
    pub fn build(blur_enabled: bool) -> Self {
        let declared = declared_stages(blur_enabled);
        let mut edges = Vec::new();
        for (i, earlier) in declared.iter().enumerate() {
            for (j, later) in declared.iter().enumerate().skip(i + 1) {
                if earlier.conflicts_with(later) {
                    edges.push((i, j));
                }
            }
        }

        // Kahn's algorithm, ties broken by declaration order
        let mut in_degree = vec![0usize; declared.len()];
        for &(_, to) in &edges {
            in_degree[to] += 1;
        }
        let mut order = Vec::with_capacity(declared.len());
        let mut placed = vec![false; declared.len()];
        while order.len() < declared.len() {
            let Some(next) = (0..declared.len()).find(|&i| !placed[i] && in_degree[i] == 0) else {
                break;
            };
            placed[next] = true;
            order.push(next);
            for &(from, to) in &edges {
                if from == next {
                    in_degree[to] -= 1;
                }
            }
        }

        let stages: Vec<Stage> = order.iter().map(|&i| declared[i]).collect();
        let position = |i: usize| order.iter().position(|&o| o == i).unwrap_or(i);
        let edges = edges
            .into_iter()
            .map(|(from, to)| (position(from), position(to)))
            .collect();

        let plan = Self { stages, edges };
        debug_assert!(plan.validate().is_ok(), "frame plan violates its own dependencies");
        plan
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Dependency edges as stage pairs.
    pub fn dependencies(&self) -> Vec<(Stage, Stage)> {
        self.edges
            .iter()
            .map(|&(from, to)| (self.stages[from], self.stages[to]))
            .collect()
    }

    /// Check that every edge points forward in the recorded order.
    pub fn validate(&self) -> Result<(), OrderViolation> {
        Self::check_order(&self.stages, &self.dependencies())
    }

    /// Check an arbitrary recording order against a set of dependencies.
    pub fn check_order(order: &[Stage], dependencies: &[(Stage, Stage)]) -> Result<(), OrderViolation> {
        for &(before, after) in dependencies {
            let b = order.iter().position(|s| *s == before);
            let a = order.iter().position(|s| *s == after);
            if let (Some(b), Some(a)) = (b, a) {
                if b >= a {
                    return Err(OrderViolation { before, after });
                }
            }
        }
        Ok(())
    }

    /// Resource each read observes: the last earlier writer in this frame,
    /// or `None` when the value carries over from the previous frame.
    pub fn producer_of(&self, stage: Stage, resource: Resource) -> Option<Stage> {
        let index = self.stages.iter().position(|s| *s == stage)?;
        self.stages[..index]
            .iter()
            .rev()
            .find(|s| s.writes().contains(&resource))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_plan_order() {
        let plan = FramePlan::build(true);
        assert_eq!(
            plan.stages(),
            &[
                Stage::WaveUpdate,
                Stage::StateCopy,
                Stage::CausticsProjection,
                Stage::BlurHorizontal,
                Stage::BlurVertical,
                Stage::Composite,
            ]
        );
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_blur_disabled_plan() {
        let plan = FramePlan::build(false);
        assert_eq!(plan.stages().len(), 4);
        assert!(!plan.contains(Stage::BlurHorizontal));
        assert!(!plan.contains(Stage::BlurVertical));
        assert_eq!(
            plan.producer_of(Stage::Composite, Resource::Caustics),
            Some(Stage::CausticsProjection)
        );
    }

    #[test]
    fn test_copy_depends_on_wave_update() {
        let plan = FramePlan::build(true);
        let deps = plan.dependencies();
        assert!(deps.contains(&(Stage::WaveUpdate, Stage::StateCopy)));
        assert!(deps.contains(&(Stage::StateCopy, Stage::CausticsProjection)));
        assert!(deps.contains(&(Stage::StateCopy, Stage::Composite)));
    }

    #[test]
    fn test_blur_result_lands_in_original_slot() {
        let plan = FramePlan::build(true);
        assert_eq!(
            plan.producer_of(Stage::Composite, Resource::Caustics),
            Some(Stage::BlurVertical)
        );
        assert_eq!(
            plan.producer_of(Stage::BlurVertical, Resource::CausticsScratch),
            Some(Stage::BlurHorizontal)
        );
    }

    #[test]
    fn test_wave_update_reads_previous_frame_state() {
        let plan = FramePlan::build(true);
        assert_eq!(plan.producer_of(Stage::WaveUpdate, Resource::GridCurrent), None);
    }

    #[test]
    fn test_reordering_copy_before_update_is_rejected() {
        let plan = FramePlan::build(true);
        let swapped = [
            Stage::StateCopy,
            Stage::WaveUpdate,
            Stage::CausticsProjection,
            Stage::BlurHorizontal,
            Stage::BlurVertical,
            Stage::Composite,
        ];
        let err = FramePlan::check_order(&swapped, &plan.dependencies()).unwrap_err();
        assert_eq!(err.before, Stage::WaveUpdate);
        assert_eq!(err.after, Stage::StateCopy);
    }

    #[test]
    fn test_reordering_blur_passes_is_rejected() {
        let plan = FramePlan::build(true);
        let swapped = [
            Stage::WaveUpdate,
            Stage::StateCopy,
            Stage::CausticsProjection,
            Stage::BlurVertical,
            Stage::BlurHorizontal,
            Stage::Composite,
        ];
        assert!(FramePlan::check_order(&swapped, &plan.dependencies()).is_err());
    }

    #[test]
    fn test_composite_is_last() {
        for blur in [false, true] {
            let plan = FramePlan::build(blur);
            assert_eq!(plan.stages().last(), Some(&Stage::Composite));
        }
    }
}
