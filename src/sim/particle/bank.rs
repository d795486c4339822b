use crate::sim::particle::ParticleState;
use std::collections::BTreeMap;
use std::fmt;

/// Tag of the physical reaction that produced a particle (ENDF MT number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionTag(pub u32);

impl ReactionTag {
    pub const ELASTIC: Self = Self(2);
    pub const N2N: Self = Self(16);
    pub const FISSION: Self = Self(18);
    pub const CAPTURE: Self = Self(102);
}

impl fmt::Display for ReactionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MT={}", self.0)
    }
}

/// Pending particles of one worker.
///
/// Banks pop in stack order: the most recently pushed particle comes out
/// first, so fresh secondaries are transported before older siblings.
pub trait Bank {
    fn push(&mut self, particle: ParticleState);

    /// Pushes a particle produced by `reaction`.
    ///
    /// Specialized banks may route it to a reaction-keyed side queue.
    fn push_from_reaction(&mut self, particle: ParticleState, _reaction: ReactionTag) {
        self.push(particle);
    }

    /// Removes the most recently pushed particle.
    fn pop(&mut self) -> Option<ParticleState>;

    fn top(&self) -> Option<&ParticleState>;

    fn top_mut(&mut self) -> Option<&mut ParticleState>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stack of particles waiting for transport.
#[derive(Debug, Clone, Default)]
pub struct ParticleBank {
    stack: Vec<ParticleState>,
}

impl ParticleBank {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Iterates from the bottom (oldest) to the top (newest) of the stack.
    pub fn iter(&self) -> impl Iterator<Item = &ParticleState> {
        self.stack.iter()
    }
}

impl Bank for ParticleBank {
    fn push(&mut self, particle: ParticleState) {
        self.stack.push(particle);
    }

    fn pop(&mut self) -> Option<ParticleState> {
        self.stack.pop()
    }

    fn top(&self) -> Option<&ParticleState> {
        self.stack.last()
    }

    fn top_mut(&mut self) -> Option<&mut ParticleState> {
        self.stack.last_mut()
    }

    fn len(&self) -> usize {
        self.stack.len()
    }
}

/// Bank that sets aside particles produced by selected reactions.
///
/// Particles pushed with a tracked reaction tag are stored in a side queue
/// for that reaction instead of the transport stack (e.g. fission sites
/// kept for the next generation). All other particles behave as in
/// [`ParticleBank`].
#[derive(Debug, Clone, Default)]
pub struct ReactionSortedBank {
    bank: ParticleBank,
    sorted: BTreeMap<ReactionTag, Vec<ParticleState>>,
}

impl ReactionSortedBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts routing particles produced by `reaction` to a side queue.
    pub fn track(mut self, reaction: ReactionTag) -> Self {
        self.sorted.entry(reaction).or_default();
        self
    }

    pub fn is_tracked(&self, reaction: ReactionTag) -> bool {
        self.sorted.contains_key(&reaction)
    }

    /// Particles set aside for `reaction` (empty if untracked).
    pub fn reaction_particles(&self, reaction: ReactionTag) -> &[ParticleState] {
        self.sorted
            .get(&reaction)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Removes and returns the particles set aside for `reaction`.
    pub fn take_reaction_particles(&mut self, reaction: ReactionTag) -> Vec<ParticleState> {
        self.sorted
            .get_mut(&reaction)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

impl Bank for ReactionSortedBank {
    fn push(&mut self, particle: ParticleState) {
        self.bank.push(particle);
    }

    fn push_from_reaction(&mut self, particle: ParticleState, reaction: ReactionTag) {
        match self.sorted.get_mut(&reaction) {
            Some(queue) => queue.push(particle),
            None => self.bank.push(particle),
        }
    }

    fn pop(&mut self) -> Option<ParticleState> {
        self.bank.pop()
    }

    fn top(&self) -> Option<&ParticleState> {
        self.bank.top()
    }

    fn top_mut(&mut self) -> Option<&mut ParticleState> {
        self.bank.top_mut()
    }

    fn len(&self) -> usize {
        self.bank.len()
    }
}
