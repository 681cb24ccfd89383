// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Translates platform input events into [`EdgeTraverser`]s, and owns the
//! flat arrays those traversers read and write.

use rustc_hash::FxHashMap;

use crate::state_machine::{EdgeTraverser, EventDescription, EventSource, TraverserPayload, UNSET};
use crate::types::{Axis2, LogicalKey, PlatformId, SourceRange, Timespan};

/// Flat backing storage for every bound input source, grouped by kind.
/// Multiple platform inputs can share a logical key's range, in which case
/// the accumulated readers below combine them.
#[derive(Debug, Clone, Default)]
pub(crate) struct InputSources {
    buttons: Vec<bool>,
    axes_1d: Vec<f32>,
    axes_2d: Vec<Axis2>,
}

impl InputSources {
    pub(crate) fn axis1d_at(&self, index: usize) -> f32 {
        self.axes_1d[index]
    }

    pub(crate) fn set_axis1d_at(&mut self, index: usize, value: f32) {
        self.axes_1d[index] = value;
    }

    pub(crate) fn axis2d_at(&self, index: usize) -> Axis2 {
        self.axes_2d[index]
    }

    pub(crate) fn set_axis2d_at(&mut self, index: usize, value: Axis2) {
        self.axes_2d[index] = value;
    }

    pub(crate) fn set_button_at(&mut self, index: usize, value: bool) {
        self.buttons[index] = value;
    }

    /// True if any button slot in `range` is currently pressed.
    pub(crate) fn accumulated_button(&self, range: SourceRange) -> bool {
        range.iter().any(|i| self.buttons[i as usize])
    }

    /// Sum of every 1D axis slot in `range`. Can exceed `[-1, 1]` when more
    /// than one source is bound to the same key.
    pub(crate) fn accumulated_axis1d(&self, range: SourceRange) -> f32 {
        range.iter().map(|i| self.axes_1d[i as usize]).sum()
    }

    /// Sum of every 2D axis slot in `range`.
    pub(crate) fn accumulated_axis2d(&self, range: SourceRange) -> Axis2 {
        range.iter().fold(Axis2::default(), |acc, i| acc + self.axes_2d[i as usize])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Button,
    Axis1D,
    Axis2D,
}

#[derive(Debug, Clone, Copy)]
struct Mapping {
    traverser: EdgeTraverser,
}

#[derive(Debug, Clone, Copy)]
struct ReverseMapping {
    kind: SourceKind,
    range: SourceRange,
    next_source: u32,
}

/// Binds platform input identifiers to logical keys and translates raw
/// platform events into [`EdgeTraverser`]s a [`crate::state_machine::StateMachine`]
/// can consume.
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    mappings: FxHashMap<PlatformId, Mapping>,
    reverse_mappings: FxHashMap<LogicalKey, ReverseMapping>,
}

impl InputMapper {
    fn add_mapping(&mut self, src: PlatformId, dst: LogicalKey, kind: SourceKind, template: TraverserPayload) {
        let traverser = EdgeTraverser {
            key: Some(dst),
            payload: template,
            ..EdgeTraverser::default()
        };
        self.mappings.insert(src, Mapping { traverser });

        let reverse = self.reverse_mappings.entry(dst).or_insert(ReverseMapping {
            kind,
            range: SourceRange { begin: 0, end: 0 },
            next_source: 0,
        });
        reverse.range.end += 1;
    }

    /// Maps a platform button to a logical key, delivered as `KeyDown`/`KeyUp`.
    pub fn add_key_mapping(&mut self, src: PlatformId, dst: LogicalKey) {
        self.add_mapping(src, dst, SourceKind::Button, TraverserPayload::KeyDown);
    }

    /// Maps a platform 1D axis (a trigger, a slider) to a logical key.
    pub fn add_axis1d_mapping(&mut self, src: PlatformId, dst: LogicalKey) {
        self.add_mapping(
            src,
            dst,
            SourceKind::Axis1D,
            TraverserPayload::Axis1D { delta: UNSET, absolute: UNSET },
        );
    }

    /// Maps a platform 2D axis (a thumbstick, a mouse delta) to a logical key.
    pub fn add_axis2d_mapping(&mut self, src: PlatformId, dst: LogicalKey) {
        self.add_mapping(
            src,
            dst,
            SourceKind::Axis2D,
            TraverserPayload::Axis2D { delta: Axis2::UNSET, absolute: Axis2::UNSET },
        );
    }

    /// Maps a platform button to a fixed 1D direction, so holding the key
    /// behaves like a thumbstick pushed to `amount`.
    pub fn add_key_as_1d_relative_mapping(&mut self, src: PlatformId, dst: LogicalKey, amount: f32) {
        self.add_mapping(
            src,
            dst,
            SourceKind::Axis1D,
            TraverserPayload::Axis1D { delta: amount, absolute: UNSET },
        );
    }

    /// Maps a platform button to a fixed 2D direction (e.g. one WASD key).
    pub fn add_key_as_2d_relative_mapping(&mut self, src: PlatformId, dst: LogicalKey, amount: Axis2) {
        self.add_mapping(
            src,
            dst,
            SourceKind::Axis2D,
            TraverserPayload::Axis2D { delta: amount, absolute: Axis2::UNSET },
        );
    }

    /// Resolves every binding's source slot, grows `sources` to fit, and
    /// fills in the [`SourceRange`]s pending event descriptions were waiting
    /// on. Called once, by [`crate::state_machine::StateMachine::new`].
    pub(crate) fn bind(&mut self, sources: &mut InputSources, events: &mut [EventDescription]) {
        for reverse in self.reverse_mappings.values_mut() {
            let count = reverse.range.len();
            let begin = match reverse.kind {
                SourceKind::Button => {
                    let begin = sources.buttons.len() as u32;
                    sources.buttons.resize(sources.buttons.len() + count as usize, false);
                    begin
                }
                SourceKind::Axis1D => {
                    let begin = sources.axes_1d.len() as u32;
                    sources.axes_1d.resize(sources.axes_1d.len() + count as usize, 0.0);
                    begin
                }
                SourceKind::Axis2D => {
                    let begin = sources.axes_2d.len() as u32;
                    sources.axes_2d.resize(sources.axes_2d.len() + count as usize, Axis2::default());
                    begin
                }
            };
            reverse.range = SourceRange { begin, end: begin + count };
        }

        for mapping in self.mappings.values_mut() {
            let Some(key) = mapping.traverser.key else { continue };
            if let Some(reverse) = self.reverse_mappings.get_mut(&key) {
                mapping.traverser.input_source = reverse.range.begin + reverse.next_source;
                mapping.traverser.input_source_range = reverse.range;
                reverse.next_source += 1;
            }
        }

        for event in events.iter_mut() {
            if let EventSource::Pending(key, kind) = event.source {
                if let Some(reverse) = self.reverse_mappings.get(&key) {
                    event.source = EventSource::Resolved(reverse.range, kind);
                }
            }
        }
    }

    /// The resolved range of source slots bound to `key`, or the empty range
    /// if nothing is bound to it.
    pub fn get_input_source(&self, key: LogicalKey) -> SourceRange {
        self.reverse_mappings.get(&key).map_or(SourceRange::default(), |r| r.range)
    }

    fn mapping_for(&self, platform: PlatformId) -> EdgeTraverser {
        self.mappings.get(&platform).map_or_else(EdgeTraverser::default, |m| m.traverser)
    }

    /// Translates a platform button press.
    pub fn on_key_down(&self, platform: PlatformId) -> EdgeTraverser {
        self.mapping_for(platform)
    }

    /// Translates a platform button release. Button mappings flip to
    /// `KeyUp`; relative-direction mappings negate their delta to undo the
    /// push applied on press.
    pub fn on_key_up(&self, platform: PlatformId) -> EdgeTraverser {
        let mut traverser = self.mapping_for(platform);
        traverser.payload = match traverser.payload {
            TraverserPayload::KeyDown => TraverserPayload::KeyUp,
            TraverserPayload::Axis1D { delta, .. } => TraverserPayload::Axis1D { delta: -delta, absolute: UNSET },
            TraverserPayload::Axis2D { delta, .. } => TraverserPayload::Axis2D { delta: -delta, absolute: Axis2::UNSET },
            other => other,
        };
        traverser
    }

    /// Translates a relative (delta) 1D axis reading.
    pub fn on_axis1d_relative(&self, platform: PlatformId, delta: f32) -> EdgeTraverser {
        let mut traverser = self.mapping_for(platform);
        if matches!(traverser.payload, TraverserPayload::Axis1D { .. }) {
            traverser.payload = TraverserPayload::Axis1D { delta, absolute: UNSET };
        } else {
            traverser.payload = TraverserPayload::Empty;
        }
        traverser
    }

    /// Translates an absolute 1D axis reading.
    pub fn on_axis1d_absolute(&self, platform: PlatformId, absolute: f32) -> EdgeTraverser {
        let mut traverser = self.mapping_for(platform);
        if matches!(traverser.payload, TraverserPayload::Axis1D { .. }) {
            traverser.payload = TraverserPayload::Axis1D { delta: UNSET, absolute };
        } else {
            traverser.payload = TraverserPayload::Empty;
        }
        traverser
    }

    /// Translates a relative (delta) 2D axis reading.
    pub fn on_axis2d_relative(&self, platform: PlatformId, delta: Axis2) -> EdgeTraverser {
        let mut traverser = self.mapping_for(platform);
        if matches!(traverser.payload, TraverserPayload::Axis2D { .. }) {
            traverser.payload = TraverserPayload::Axis2D { delta, absolute: Axis2::UNSET };
        } else {
            traverser.payload = TraverserPayload::Empty;
        }
        traverser
    }

    /// Translates an absolute 2D axis reading.
    pub fn on_axis2d_absolute(&self, platform: PlatformId, absolute: Axis2) -> EdgeTraverser {
        let mut traverser = self.mapping_for(platform);
        if matches!(traverser.payload, TraverserPayload::Axis2D { .. }) {
            traverser.payload = TraverserPayload::Axis2D { delta: Axis2::UNSET, absolute };
        } else {
            traverser.payload = TraverserPayload::Empty;
        }
        traverser
    }

    /// Builds a clock-advance traverser, applied to every active node
    /// regardless of platform bindings.
    pub fn on_tick(&self, elapsed: Timespan) -> EdgeTraverser {
        EdgeTraverser {
            payload: TraverserPayload::Tick { elapsed },
            ..EdgeTraverser::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_platform_buttons_share_one_range() {
        let mut mapper = InputMapper::default();
        mapper.add_key_mapping(1, 10);
        mapper.add_key_mapping(2, 10);
        let mut sources = InputSources::default();
        let mut events: [EventDescription; 0] = [];
        mapper.bind(&mut sources, &mut events);

        let range = mapper.get_input_source(10);
        assert_eq!(range.len(), 2);
        assert_eq!(sources.buttons.len(), 2);

        let a = mapper.on_key_down(1);
        let b = mapper.on_key_down(2);
        assert_ne!(a.input_source, b.input_source);
        assert_eq!(a.input_source_range, range);
        assert_eq!(b.input_source_range, range);
    }

    #[test]
    fn key_up_negates_relative_direction_delta() {
        let mut mapper = InputMapper::default();
        mapper.add_key_as_1d_relative_mapping(1, 20, 1.0);
        let mut sources = InputSources::default();
        let mut events: [EventDescription; 0] = [];
        mapper.bind(&mut sources, &mut events);

        let down = mapper.on_key_down(1);
        assert_eq!(down.payload, TraverserPayload::Axis1D { delta: 1.0, absolute: UNSET });

        let up = mapper.on_key_up(1);
        assert_eq!(up.payload, TraverserPayload::Axis1D { delta: -1.0, absolute: UNSET });
    }

    #[test]
    fn unmapped_platform_id_yields_empty_traverser() {
        let mapper = InputMapper::default();
        assert!(mapper.on_key_down(999).is_empty());
    }
}
