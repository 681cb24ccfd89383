// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two platform buttons bound to the same logical key must not double-fire
//! a trigger: the accumulated button state only transitions once.

use warp_input::{EdgeGuard, EventDescription, InputMapper, StateMachine, StateMachineBuilder, ROOT_NODE};

const ACTION_2: u32 = 7;
const ACTION_2_TRIGGER: u32 = 1;

#[test]
fn only_the_first_and_last_press_produce_events() {
    let mut builder = StateMachineBuilder::new();
    let trigger = builder.add_node(Some(EventDescription::emit(ACTION_2_TRIGGER)));
    builder.add_edge(ROOT_NODE, trigger, Some(ACTION_2), EdgeGuard::KeyDown, false, false);
    builder.add_edge(trigger, ROOT_NODE, Some(ACTION_2), EdgeGuard::KeyUp, false, false);

    let mut mapper = InputMapper::default();
    mapper.add_key_mapping(101, ACTION_2);
    mapper.add_key_mapping(102, ACTION_2);

    let mut machine = StateMachine::new(builder, mapper);

    machine.traverse(machine.mapper().on_key_down(101));
    assert_eq!(machine.read_events().len(), 1);
    machine.clear_events();

    machine.traverse(machine.mapper().on_key_down(102));
    assert!(machine.read_events().is_empty());

    machine.traverse(machine.mapper().on_key_up(101));
    assert!(machine.read_events().is_empty());
    assert!(machine.is_node_active(trigger));

    machine.traverse(machine.mapper().on_key_up(102));
    assert!(machine.read_events().is_empty());
    assert!(!machine.is_node_active(trigger));

    machine.traverse(machine.mapper().on_key_down(101));
    assert_eq!(machine.read_events().len(), 1);
    assert_eq!(machine.read_events()[0].id, ACTION_2_TRIGGER);
}
