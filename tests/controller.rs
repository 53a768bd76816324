//! Tests that load a program and drive the controller through its public API.

use trafcod::{Controller, ControllerConfig, Error, Event, LightColor, RuleHalf};

fn config() -> ControllerConfig {
    ControllerConfig::new("TLC")
        .with_detector("D011")
        .with_detector("D012")
        .with_detector("D081")
        .with_traffic_light("08.1")
        .with_traffic_light("TLC.08.2")
        .with_traffic_light("05.1")
}

fn load(program: &str) -> Controller {
    Controller::load(&config(), program).unwrap()
}

fn value(controller: &Controller, name: &str) -> i32 {
    controller.variable(name).unwrap().value()
}

fn light_changes(events: &[Event]) -> Vec<(String, LightColor)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::LightChanged { light, color, .. } => Some((light.clone(), *color)),
            _ => None,
        })
        .collect()
}

/// Test that a program without input changes settles after one tick.
#[test]
fn stable_program_is_idempotent() {
    let mut c = load("%init A01 1\nA01N.=D011\nB01=A01\nC01=B01N");
    let first = c.tick(0.1).unwrap();
    assert!(first.changed_count > 0);
    assert_eq!(value(&c, "B01"), 1);
    assert_eq!(value(&c, "C01"), 0);

    for time in [0.2, 0.3] {
        let report = c.tick(time).unwrap();
        assert_eq!(report.changed_count, 0);
        assert_eq!(report.iterations_used, 1);
        assert!(!report.oscillation_detected);
    }
}

/// Test the operators through complete rules.
#[test]
fn operator_semantics() {
    let operands = [0, 1, 5, -3];
    for a in operands {
        for b in operands {
            let program = [".", "+", "-", ">", "<", ">=", "<=", "=", "<>"]
                .iter()
                .enumerate()
                .map(|(i, op)| format!("V{:02}=({}){}({})", i + 1, a, op, b))
                .collect::<Vec<_>>()
                .join("\n");
            let mut c = load(&program);
            c.tick(0.1).unwrap();
            let expected = [
                (a != 0 && b != 0) as i32,
                (a != 0 || b != 0) as i32,
                a - b,
                (a > b) as i32,
                (a < b) as i32,
                (a >= b) as i32,
                (a <= b) as i32,
                (a == b) as i32,
                (a != b) as i32,
            ];
            for (i, expected) in expected.iter().enumerate() {
                let name = format!("V{:02}", i + 1);
                assert_eq!(value(&c, &name), *expected, "{} with a={}, b={}", name, a, b);
            }
        }
    }
}

/// Test that a started variable stays active until its end rule fires.
#[test]
fn start_end_latching() {
    let mut c = load("S A01.=D011\nE A01.=D012");
    c.on_detector("D011", true).unwrap();
    c.tick(0.1).unwrap();
    assert_eq!(value(&c, "A01"), 1);

    c.on_detector("D011", false).unwrap();
    for tick in 2..20 {
        let report = c.tick(tick as f64 * 0.1).unwrap();
        assert_eq!(value(&c, "A01"), 1);
        if tick > 2 {
            assert_eq!(report.changed_count, 0);
        }
    }

    c.on_detector("D012", true).unwrap();
    c.tick(2.0).unwrap();
    assert_eq!(value(&c, "A01"), 0);
}

/// Test that a latched variable's start edge does not outlive its rule.
#[test]
fn latched_start_edge_is_cleared() {
    let mut c = load("A01.=D011\nA01N.=D012\nB01=SA01");
    c.on_detector("D011", true).unwrap();
    c.tick(0.1).unwrap();
    assert_eq!(value(&c, "A01"), 1);
    assert_eq!(value(&c, "B01"), 0);

    c.tick(0.2).unwrap();
    assert_eq!(value(&c, "B01"), 0);
}

/// Test that a negated destination is assigned the plain expression value.
#[test]
fn negated_assignment() {
    let mut c = load("A01N=D011");
    c.tick(0.1).unwrap();
    assert_eq!(value(&c, "A01"), 0);

    c.on_detector("D011", true).unwrap();
    c.tick(0.2).unwrap();
    assert_eq!(value(&c, "A01"), 1);
}

/// Test that a timer of 3 s runs for exactly 30 ticks.
#[test]
fn timer_countdown() {
    let mut c = load("%time T01 30\nIT01.=D011\nB01.=ET01");
    c.on_detector("D011", true).unwrap();
    c.tick(0.1).unwrap();
    c.on_detector("D011", false).unwrap();
    assert_eq!(value(&c, "T01"), 30);

    for tick in 1..30 {
        let report = c.tick(0.1 * (tick + 1) as f64).unwrap();
        assert_eq!(value(&c, "T01"), 30 - tick);
        assert_eq!(value(&c, "B01"), 0);
        if tick > 1 {
            assert_eq!(report.changed_count, 0);
        }
    }

    // The expiry and the latch picking up its end edge
    let report = c.tick(3.1).unwrap();
    assert_eq!(value(&c, "T01"), 0);
    assert_eq!(value(&c, "B01"), 1);
    assert_eq!(report.changed_count, 2);
}

/// Test that a timer's end edge is seen by one pass only.
#[test]
fn timer_end_edge_does_not_persist() {
    let mut c = load("%time T01 2\nIT01.=D011\nA01=ET01");
    c.on_detector("D011", true).unwrap();
    c.tick(0.1).unwrap();
    c.on_detector("D011", false).unwrap();
    for time in [0.2, 0.3] {
        c.tick(time).unwrap();
    }
    assert_eq!(value(&c, "T01"), 0);
    assert_eq!(value(&c, "A01"), 0);
}

/// Test that a longer tick interval counts timers down faster.
#[test]
fn timer_steps_follow_tick_interval() {
    let config = config().with_tick_interval(0.5);
    let mut c = Controller::load(&config, "%time T01 30\nIT01.=D011").unwrap();
    c.on_detector("D011", true).unwrap();
    c.tick(0.5).unwrap();
    c.on_detector("D011", false).unwrap();
    for tick in 1..6 {
        c.tick(0.5 * (tick + 1) as f64).unwrap();
        assert_eq!(value(&c, "T01"), 30 - 5 * tick);
    }
    c.tick(3.5).unwrap();
    assert_eq!(value(&c, "T01"), 0);
}

/// Test that detector changes reach the detector variable on the next tick.
#[test]
fn detector_round_trip() {
    let mut c = load("A08=D081");
    c.on_detector("D081", true).unwrap();
    assert_eq!(value(&c, "D081"), 0);
    c.tick(0.1).unwrap();
    assert_eq!(value(&c, "D081"), 1);
    assert_eq!(value(&c, "A08"), 1);

    c.on_detector("d081", false).unwrap();
    c.tick(0.2).unwrap();
    assert_eq!(value(&c, "D081"), 0);
    assert_eq!(value(&c, "A08"), 0);

    assert!(matches!(c.on_detector("D099", true), Err(Error::Config(_))));
    assert!(matches!(c.on_detector("A08", true), Err(Error::Config(_))));
}

/// Test that an output switches all of its lights when it is activated.
#[test]
fn output_propagation() {
    let mut c = load("%export RA08 R\nRA08=D081");
    assert!(c.take_events().iter().all(|e| !matches!(e, Event::LightChanged { .. })));

    c.on_detector("D081", true).unwrap();
    c.tick(0.1).unwrap();
    let mut changes = light_changes(&c.take_events());
    changes.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        changes,
        vec![
            ("08.1".to_string(), LightColor::Red),
            ("TLC.08.2".to_string(), LightColor::Red),
        ]
    );
    let colors = c
        .iter_lights()
        .filter(|(_, light)| light.stream() == Some(8))
        .map(|(_, light)| light.color())
        .collect::<Vec<_>>();
    assert_eq!(colors, vec![Some(LightColor::Red), Some(LightColor::Red)]);

    c.on_detector("D081", false).unwrap();
    c.tick(0.2).unwrap();
    assert_eq!(value(&c, "RA08"), 0);
    assert!(light_changes(&c.take_events()).is_empty());
}

/// Test that an initialised output switches its lights at load.
#[test]
fn initialised_output() {
    let mut c = load("%init GA05\n%export GA05 G\nGA05N.=D011");
    assert_eq!(
        light_changes(&c.take_events()),
        vec![("05.1".to_string(), LightColor::Green)]
    );
    c.tick(0.1).unwrap();
    assert_eq!(value(&c, "GA05"), 1);
}

/// Test that lights can be added and subscribed after loading.
#[test]
fn runtime_subscriptions() {
    let mut c = load("%export YA08 Y\nYA08=D081");
    let extra = c.add_traffic_light("TLC.08.3");
    let other = c.add_traffic_light("99.1");
    c.subscribe_output("YA08", other).unwrap();
    assert!(matches!(c.subscribe_output("D081", other), Err(Error::Config(_))));
    assert!(matches!(c.subscribe_output("XX08", other), Err(Error::Config(_))));

    c.on_detector("D081", true).unwrap();
    c.tick(0.1).unwrap();
    assert_eq!(light_changes(&c.take_events()).len(), 4);
    assert_eq!(c.get_light(extra).color(), Some(LightColor::Yellow));
    assert_eq!(c.get_light(other).color(), Some(LightColor::Yellow));
}

/// Test that mutually dependent rules are cut off at the loop limit.
#[test]
fn oscillation_is_detected() {
    let mut c = load("A01=B01N\nB01=A01");
    c.take_events();
    let report = c.tick(0.1).unwrap();
    assert!(report.oscillation_detected);
    assert_eq!(report.iterations_used, 10);
    assert_eq!(report.changed_count, 20);
    let warnings = c
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, Event::Warning { .. }))
        .count();
    assert_eq!(warnings, 1);

    let config = config().with_max_loop_count(3);
    let mut c = Controller::load(&config, "A01=B01N\nB01=A01").unwrap();
    let report = c.tick(0.1).unwrap();
    assert!(report.oscillation_detected);
    assert_eq!(report.iterations_used, 3);
}

/// Test that malformed programs are rejected.
#[test]
fn parse_rejections() {
    assert!(matches!(
        Controller::load(&config(), "X=(1+2"),
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        Controller::load(&config(), "=5"),
        Err(Error::Syntax { .. })
    ));
    match Controller::load(&config(), "S A01=1\nS A01=1") {
        Err(Error::DuplicateRule {
            variable, half, first, location,
        }) => {
            assert_eq!(variable, "A01");
            assert_eq!(half, RuleHalf::Start);
            assert_eq!(first.line, 1);
            assert_eq!(location.line, 2);
        }
        other => panic!("expected a duplicate rule error, got {:?}", other.err()),
    }
}

/// Test that programs that do not fit the intersection are rejected.
#[test]
fn configuration_errors() {
    assert!(matches!(
        Controller::load(&config(), "%export RA03 R\nRA03=D011"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        Controller::load(&config(), "A02=D021"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        Controller::load(&config(), "# trafcod-version=101\nA01=D011"),
        Err(Error::Config(_))
    ));
}

/// Test that rules can be rendered with their operand values.
#[test]
fn rule_rendering() {
    let mut c = load("RA08=D081N.(A08+3)\nIT08.=SD081");
    c.tick(0.1).unwrap();
    let rendered = c
        .rules()
        .iter()
        .map(|rule| c.render_rule(rule, true))
        .collect::<Vec<_>>();
    assert_eq!(rendered[0], "RA08<1>=D081N<1>.(A08<0>+3)");
    assert_eq!(c.render_rule(&c.rules()[1], false), "IT08.=SD081");
}
