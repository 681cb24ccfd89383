// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Guarded input state machine: a graph of nodes and edges that consumes
//! [`EdgeTraverser`]s produced by the [`crate::mapper::InputMapper`] and
//! publishes [`Event`]s as active nodes change.

use crate::mapper::{InputMapper, InputSources};
use crate::types::{Axis2, EdgeIndex, EventId, LogicalKey, NodeIndex, SourceRange, Timespan, ROOT_NODE};

/// Sentinel written into an axis field to mean "not provided by this
/// traverser"; the missing side is computed from the current input state.
pub const UNSET: f32 = f32::MAX;

/// The payload an [`EdgeTraverser`] carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraverserPayload {
    /// No-op; traversal stops immediately.
    Empty,
    /// A mapped button transitioned to pressed.
    KeyDown,
    /// A mapped button transitioned to released.
    KeyUp,
    /// A clock advance, applied to every active node's `time_active`.
    Tick {
        /// Elapsed time since the previous tick.
        elapsed: Timespan,
    },
    /// A 1D axis change. One of `delta`/`absolute` may be [`UNSET`].
    Axis1D {
        /// Change relative to this source's previous value.
        delta: f32,
        /// Accumulated value across every source bound to this key.
        absolute: f32,
    },
    /// A 2D axis change. One of `delta`/`absolute` may be [`Axis2::UNSET`].
    Axis2D {
        /// Change relative to this source's previous value.
        delta: Axis2,
        /// Accumulated value across every source bound to this key.
        absolute: Axis2,
    },
}

/// One input event submitted to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTraverser {
    pub(crate) key: Option<LogicalKey>,
    pub(crate) input_source: u32,
    pub(crate) input_source_range: SourceRange,
    pub(crate) payload: TraverserPayload,
}

impl Default for EdgeTraverser {
    fn default() -> Self {
        Self {
            key: None,
            input_source: 0,
            input_source_range: SourceRange::default(),
            payload: TraverserPayload::Empty,
        }
    }
}

impl EdgeTraverser {
    /// True if this traverser carries no payload and should stop traversal
    /// immediately.
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, TraverserPayload::Empty)
    }
}

/// The predicate evaluated when traversing an edge.
#[derive(Debug, Clone, Copy)]
pub enum EdgeGuard {
    /// Always passes.
    Empty,
    /// Passes once the source node's `time_active` reaches `threshold`.
    Timeout {
        /// Minimum accumulated active time required.
        threshold: Timespan,
    },
    /// Passes iff the traverser is a key-down.
    KeyDown,
    /// Passes iff the traverser is a key-up.
    KeyUp,
    /// Passes iff the traverser is a 1D axis whose delta lies in `[min, max]`.
    Delta1D {
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },
    /// Passes iff the traverser is a 2D axis whose delta lies in `[min, max]`
    /// component-wise.
    Delta2D {
        /// Inclusive lower bound.
        min: Axis2,
        /// Inclusive upper bound.
        max: Axis2,
    },
    /// Passes iff the traverser is a 1D axis whose absolute lies in
    /// `[min, max]`.
    Absolute1D {
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },
    /// Passes iff the traverser is a 2D axis whose absolute lies in
    /// `[min, max]` component-wise.
    Absolute2D {
        /// Inclusive lower bound.
        min: Axis2,
        /// Inclusive upper bound.
        max: Axis2,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub(crate) key: Option<LogicalKey>,
    pub(crate) guard: EdgeGuard,
    pub(crate) consume: bool,
    pub(crate) fork: bool,
    pub(crate) to: NodeIndex,
    pub(crate) next_edge: Option<EdgeIndex>,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Node {
    pub(crate) first_edge: Option<EdgeIndex>,
    pub(crate) event_index: Option<usize>,
    pub(crate) time_active: Timespan,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EventSourceKind {
    Axis1D,
    Axis2D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EventSource {
    None,
    Pending(LogicalKey, EventSourceKind),
    Resolved(SourceRange, EventSourceKind),
}

/// Describes the event a node emits the first time it becomes active.
#[derive(Debug, Clone, Copy)]
pub struct EventDescription {
    pub(crate) id: EventId,
    pub(crate) source: EventSource,
}

impl EventDescription {
    /// An event with no axis payload.
    pub fn emit(id: EventId) -> Self {
        Self {
            id,
            source: EventSource::None,
        }
    }

    /// An event whose payload is the accumulated 1D axis value bound to
    /// `key`, resolved once the machine is built.
    pub fn emit_axis1d(id: EventId, key: LogicalKey) -> Self {
        Self {
            id,
            source: EventSource::Pending(key, EventSourceKind::Axis1D),
        }
    }

    /// An event whose payload is the accumulated 2D axis value bound to
    /// `key`, resolved once the machine is built.
    pub fn emit_axis2d(id: EventId, key: LogicalKey) -> Self {
        Self {
            id,
            source: EventSource::Pending(key, EventSourceKind::Axis2D),
        }
    }
}

/// A published event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// The event kind, as given to [`EventDescription::emit`].
    pub id: EventId,
    /// How long the traversed-from node had been active before this event
    /// fired.
    pub time_in_node: Timespan,
    /// The event's axis payload, if any.
    pub payload: EventPayload,
}

/// An event's axis payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    /// No axis data.
    Empty,
    /// A 1D axis snapshot.
    Axis1D {
        /// Delta carried by the traverser that triggered this event, or zero
        /// if the event's axis differs from the triggering one.
        delta: f32,
        /// Accumulated value across every source bound to the event's key.
        absolute: f32,
    },
    /// A 2D axis snapshot.
    Axis2D {
        /// Delta carried by the traverser that triggered this event, or zero
        /// if the event's axis differs from the triggering one.
        delta: Axis2,
        /// Accumulated value across every source bound to the event's key.
        absolute: Axis2,
    },
}

/// Builds up the node/edge graph before it is bound to an [`InputMapper`]
/// and finalized into a [`StateMachine`].
#[derive(Debug, Clone)]
pub struct StateMachineBuilder {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) events: Vec<EventDescription>,
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachineBuilder {
    /// A builder containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            edges: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Adds a node, optionally emitting an event the first time it becomes
    /// active. Returns the new node's index.
    pub fn add_node(&mut self, event: Option<EventDescription>) -> NodeIndex {
        let index = self.nodes.len() as NodeIndex;
        let event_index = event.map(|e| {
            self.events.push(e);
            self.events.len() - 1
        });
        self.nodes.push(Node {
            event_index,
            ..Node::default()
        });
        index
    }

    /// Adds an edge from `from` to `to`, appended after `from`'s existing
    /// edges so traversal order matches insertion order.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        key: Option<LogicalKey>,
        guard: EdgeGuard,
        consume: bool,
        fork: bool,
    ) -> EdgeIndex {
        let index = self.edges.len() as EdgeIndex;
        self.edges.push(Edge {
            key,
            guard,
            consume,
            fork,
            to,
            next_edge: None,
        });
        match self.nodes[from as usize].first_edge {
            None => self.nodes[from as usize].first_edge = Some(index),
            Some(mut cursor) => {
                loop {
                    match self.edges[cursor as usize].next_edge {
                        Some(next) => cursor = next,
                        None => {
                            self.edges[cursor as usize].next_edge = Some(index);
                            break;
                        }
                    }
                }
            }
        }
        index
    }
}

fn guard_passes(edge: &Edge, traverser: &EdgeTraverser, time_active: Timespan) -> bool {
    if let Some(expected) = edge.key {
        if traverser.key != Some(expected) {
            return false;
        }
    }
    match edge.guard {
        EdgeGuard::Empty => true,
        EdgeGuard::Timeout { threshold } => time_active >= threshold,
        EdgeGuard::KeyDown => matches!(traverser.payload, TraverserPayload::KeyDown),
        EdgeGuard::KeyUp => matches!(traverser.payload, TraverserPayload::KeyUp),
        EdgeGuard::Delta1D { min, max } => match traverser.payload {
            TraverserPayload::Axis1D { delta, .. } => delta >= min && delta <= max,
            _ => false,
        },
        EdgeGuard::Absolute1D { min, max } => match traverser.payload {
            TraverserPayload::Axis1D { absolute, .. } => absolute >= min && absolute <= max,
            _ => false,
        },
        EdgeGuard::Delta2D { min, max } => match traverser.payload {
            TraverserPayload::Axis2D { delta, .. } => delta.between(min, max),
            _ => false,
        },
        EdgeGuard::Absolute2D { min, max } => match traverser.payload {
            TraverserPayload::Axis2D { absolute, .. } => absolute.between(min, max),
            _ => false,
        },
    }
}

#[allow(clippy::float_cmp)] // UNSET is a sentinel identity check, not a numeric comparison
fn fill_and_commit(sources: &mut InputSources, traverser: &mut EdgeTraverser) {
    let range = traverser.input_source_range;
    let idx = traverser.input_source as usize;
    traverser.payload = match traverser.payload {
        TraverserPayload::Axis1D { delta, absolute } => {
            let current = sources.axis1d_at(idx);
            let this_source_absolute = if absolute == UNSET { delta + current } else { absolute };
            let new_delta = this_source_absolute - current;
            sources.set_axis1d_at(idx, this_source_absolute);
            TraverserPayload::Axis1D {
                delta: new_delta,
                absolute: sources.accumulated_axis1d(range),
            }
        }
        TraverserPayload::Axis2D { delta, absolute } => {
            let current = sources.axis2d_at(idx);
            let this_source_absolute = if absolute == Axis2::UNSET { delta + current } else { absolute };
            let new_delta = Axis2::new(
                this_source_absolute.x - current.x,
                this_source_absolute.y - current.y,
            );
            sources.set_axis2d_at(idx, this_source_absolute);
            TraverserPayload::Axis2D {
                delta: new_delta,
                absolute: sources.accumulated_axis2d(range),
            }
        }
        TraverserPayload::KeyDown => {
            let before = sources.accumulated_button(range);
            sources.set_button_at(idx, true);
            let after = sources.accumulated_button(range);
            if before == after {
                TraverserPayload::Empty
            } else {
                TraverserPayload::KeyDown
            }
        }
        TraverserPayload::KeyUp => {
            let before = sources.accumulated_button(range);
            sources.set_button_at(idx, false);
            let after = sources.accumulated_button(range);
            if before == after {
                TraverserPayload::Empty
            } else {
                TraverserPayload::KeyUp
            }
        }
        other @ (TraverserPayload::Tick { .. } | TraverserPayload::Empty) => other,
    };
}

fn build_event_payload(description: EventDescription, traverser: &EdgeTraverser, sources: &InputSources) -> EventPayload {
    match description.source {
        EventSource::None | EventSource::Pending(..) => EventPayload::Empty,
        EventSource::Resolved(range, EventSourceKind::Axis1D) => {
            if range == traverser.input_source_range {
                if let TraverserPayload::Axis1D { delta, absolute } = traverser.payload {
                    return EventPayload::Axis1D { delta, absolute };
                }
            }
            EventPayload::Axis1D {
                delta: 0.0,
                absolute: sources.accumulated_axis1d(range),
            }
        }
        EventSource::Resolved(range, EventSourceKind::Axis2D) => {
            if range == traverser.input_source_range {
                if let TraverserPayload::Axis2D { delta, absolute } = traverser.payload {
                    return EventPayload::Axis2D { delta, absolute };
                }
            }
            EventPayload::Axis2D {
                delta: Axis2::default(),
                absolute: sources.accumulated_axis2d(range),
            }
        }
    }
}

/// Holds the current logical input state: which nodes are active, how long
/// they have been, and the published events their transitions produced.
#[derive(Debug, Clone)]
pub struct StateMachine {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    active_nodes: Vec<NodeIndex>,
    event_descriptions: Vec<EventDescription>,
    published_events: Vec<Event>,
    mapper: InputMapper,
    sources: InputSources,
}

impl StateMachine {
    /// Binds `mapper` to `builder`'s node/event graph and finalizes it. The
    /// root node starts active.
    pub fn new(mut builder: StateMachineBuilder, mut mapper: InputMapper) -> Self {
        builder.nodes[ROOT_NODE as usize].is_active = true;
        let mut sources = InputSources::default();
        mapper.bind(&mut sources, &mut builder.events);
        Self {
            nodes: builder.nodes,
            edges: builder.edges,
            active_nodes: vec![ROOT_NODE],
            event_descriptions: builder.events,
            published_events: Vec::new(),
            mapper,
            sources,
        }
    }

    /// Submits one input event, possibly changing active nodes and
    /// publishing events.
    pub fn traverse(&mut self, mut traverser: EdgeTraverser) {
        if traverser.is_empty() {
            return;
        }
        fill_and_commit(&mut self.sources, &mut traverser);
        if traverser.is_empty() {
            return;
        }
        let tick_elapsed = match traverser.payload {
            TraverserPayload::Tick { elapsed } => Some(elapsed),
            _ => None,
        };

        let mut i = 0;
        while i < self.active_nodes.len() {
            let active = self.active_nodes[i];
            if let Some(elapsed) = tick_elapsed {
                self.nodes[active as usize].time_active += elapsed;
            }

            let mut removed_active_node = false;
            let mut event_consumed = false;
            let mut current_edge = self.nodes[active as usize].first_edge;

            while let Some(edge_index) = current_edge {
                let edge = self.edges[edge_index as usize];
                let time_active = self.nodes[active as usize].time_active;
                if !guard_passes(&edge, &traverser, time_active) {
                    current_edge = edge.next_edge;
                    continue;
                }

                if edge.consume {
                    event_consumed = true;
                }

                if edge.to != ROOT_NODE && !self.nodes[edge.to as usize].is_active {
                    self.nodes[edge.to as usize].is_active = true;
                    self.active_nodes.push(edge.to);
                    if let Some(event_index) = self.nodes[edge.to as usize].event_index {
                        let description = self.event_descriptions[event_index];
                        let payload = build_event_payload(description, &traverser, &self.sources);
                        self.published_events.push(Event {
                            id: description.id,
                            time_in_node: time_active,
                            payload,
                        });
                    }
                }

                if active != ROOT_NODE && (edge.to == ROOT_NODE || !edge.fork) {
                    self.nodes[active as usize].is_active = false;
                    self.nodes[active as usize].time_active = 0;
                    self.active_nodes.swap_remove(i);
                    removed_active_node = true;
                    break;
                }
                if edge.consume {
                    break;
                }
                current_edge = edge.next_edge;
            }

            if event_consumed {
                return;
            }
            if !removed_active_node {
                i += 1;
            }
        }
    }

    /// True if `node` is currently active.
    pub fn is_node_active(&self, node: NodeIndex) -> bool {
        self.nodes[node as usize].is_active
    }

    /// The accumulated 1D axis value across `range`.
    pub fn get_absolute_axis_1d(&self, range: SourceRange) -> f32 {
        self.sources.accumulated_axis1d(range)
    }

    /// The accumulated 2D axis value across `range`.
    pub fn get_absolute_axis_2d(&self, range: SourceRange) -> Axis2 {
        self.sources.accumulated_axis2d(range)
    }

    /// True if any button in `range` is currently pressed.
    pub fn get_button_pressed(&self, range: SourceRange) -> bool {
        self.sources.accumulated_button(range)
    }

    /// Events published since the last [`StateMachine::clear_events`].
    pub fn read_events(&self) -> &[Event] {
        &self.published_events
    }

    /// Drops all published events.
    pub fn clear_events(&mut self) {
        self.published_events.clear();
    }

    /// The mapper bound to this machine, for translating platform input into
    /// traversers.
    pub fn mapper(&self) -> &InputMapper {
        &self.mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::InputMapper;

    const ACTION_2: LogicalKey = 1;
    const A1: LogicalKey = 2;
    const ACTION_2_TRIGGER: EventId = 100;
    const BEGIN: EventId = 101;
    const RELEASE: EventId = 102;

    fn redundant_key_down_machine() -> (StateMachine, NodeIndex) {
        let mut builder = StateMachineBuilder::new();
        let trigger = builder.add_node(Some(EventDescription::emit(ACTION_2_TRIGGER)));
        builder.add_edge(ROOT_NODE, trigger, Some(ACTION_2), EdgeGuard::KeyDown, false, false);
        builder.add_edge(trigger, ROOT_NODE, Some(ACTION_2), EdgeGuard::KeyUp, false, false);

        let mut mapper = InputMapper::default();
        mapper.add_key_mapping(1, ACTION_2);
        mapper.add_key_mapping(2, ACTION_2);

        (StateMachine::new(builder, mapper), trigger)
    }

    #[test]
    fn redundant_key_down_suppresses_duplicate_events() {
        let (mut machine, trigger) = redundant_key_down_machine();

        let t = machine.mapper().on_key_down(1);
        machine.traverse(t);
        assert_eq!(machine.read_events().len(), 1);
        assert_eq!(machine.read_events()[0].id, ACTION_2_TRIGGER);
        assert!(machine.is_node_active(trigger));
        machine.clear_events();

        let t = machine.mapper().on_key_down(2);
        machine.traverse(t);
        assert!(machine.read_events().is_empty());

        let t = machine.mapper().on_key_up(1);
        machine.traverse(t);
        assert!(machine.read_events().is_empty());
        assert!(machine.is_node_active(trigger));

        let t = machine.mapper().on_key_down(2);
        machine.traverse(t);
        assert!(machine.read_events().is_empty());

        let t = machine.mapper().on_key_up(2);
        machine.traverse(t);
        assert!(machine.read_events().is_empty());
        assert!(!machine.is_node_active(trigger));

        let t = machine.mapper().on_key_down(1);
        machine.traverse(t);
        assert_eq!(machine.read_events().len(), 1);
        assert_eq!(machine.read_events()[0].id, ACTION_2_TRIGGER);
    }

    #[test]
    fn charge_and_release_reports_time_in_node() {
        let mut builder = StateMachineBuilder::new();
        let begin = builder.add_node(Some(EventDescription::emit(BEGIN)));
        let hold = builder.add_node(None);
        let release = builder.add_node(Some(EventDescription::emit(RELEASE)));
        builder.add_edge(ROOT_NODE, begin, Some(A1), EdgeGuard::KeyDown, false, false);
        builder.add_edge(begin, hold, None, EdgeGuard::Empty, false, false);
        builder.add_edge(hold, release, Some(A1), EdgeGuard::KeyUp, false, false);

        let mut mapper = InputMapper::default();
        mapper.add_key_mapping(1, A1);
        let mut machine = StateMachine::new(builder, mapper);

        let t = machine.mapper().on_key_down(1);
        machine.traverse(t);
        assert_eq!(machine.read_events().len(), 1);
        assert_eq!(machine.read_events()[0].id, BEGIN);
        assert_eq!(machine.read_events()[0].time_in_node, 0);
        assert!(machine.is_node_active(hold));
        machine.clear_events();

        machine.traverse(machine.mapper().on_tick(2));

        let t = machine.mapper().on_key_up(1);
        machine.traverse(t);
        assert_eq!(machine.read_events().len(), 1);
        assert_eq!(machine.read_events()[0].id, RELEASE);
        assert_eq!(machine.read_events()[0].time_in_node, 2);
        assert!(machine.is_node_active(release));
        assert!(!machine.is_node_active(hold));
    }
}
