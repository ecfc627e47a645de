//! Cycle-by-cycle scenarios against literal time sequences.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use guidance_arbiter_core::{
    AttentionMode, AttentionSample, BreakTies, GraceMode, GuidanceAction, GuidanceCfg,
    GuidanceError, Result, TaskId,
};
use guidance_arbiter_supervisor::{
    AcceptabilitySource, GuidanceArbiter, GuidanceSink, JsonLinesBeliefLog, SubtaskAcceptability,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Clone, Default)]
struct Recorder {
    effects: Rc<RefCell<Vec<GuidanceAction>>>,
    fail: Rc<Cell<bool>>,
    fail_hide: Rc<Cell<bool>>,
}

impl Recorder {
    fn effects(&self) -> Vec<GuidanceAction> {
        self.effects.borrow().clone()
    }
}

impl GuidanceSink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn show_guidance(&mut self, task: &TaskId) -> Result<()> {
        if self.fail.get() {
            return Err(GuidanceError::Actuator {
                actuator: "recorder".to_string(),
                message: "display unavailable".to_string(),
            });
        }
        self.effects.borrow_mut().push(GuidanceAction::Show(task.clone()));
        Ok(())
    }

    fn hide_guidance(&mut self, task: &TaskId) -> Result<()> {
        if self.fail_hide.get() {
            return Err(GuidanceError::Actuator {
                actuator: "recorder".to_string(),
                message: "display unavailable".to_string(),
            });
        }
        self.effects.borrow_mut().push(GuidanceAction::Hide(task.clone()));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn id(s: &str) -> TaskId {
    TaskId::new(s).unwrap()
}

fn arbiter(cfg: GuidanceCfg) -> (GuidanceArbiter, Recorder) {
    let rec = Recorder::default();
    let arb = GuidanceArbiter::builder(cfg, TaskId::standard_tasks())
        .actuator(rec.clone())
        .rng(StdRng::seed_from_u64(17))
        .build()
        .unwrap();
    (arb, rec)
}

fn mouse_cfg() -> GuidanceCfg {
    GuidanceCfg {
        attention_mode: AttentionMode::Mouse,
        ..GuidanceCfg::default()
    }
}

#[test]
fn grace_elapses_monotonically() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    arb.observe("tracking", true, false, 0.0).unwrap();

    assert_eq!(arb.decide(0.0).unwrap(), GuidanceAction::None);
    assert_eq!(arb.decide(1.0).unwrap(), GuidanceAction::None);
    assert_eq!(arb.decide(2.0).unwrap(), GuidanceAction::None);
    assert!(arb.guided_task().is_none());

    assert_eq!(arb.decide(3.1).unwrap(), GuidanceAction::Show(id("tracking")));
    assert_eq!(arb.guided_task(), Some(&id("tracking")));
    assert_eq!(rec.effects(), vec![GuidanceAction::Show(id("tracking"))]);
    assert_eq!(arb.beliefs().get("tracking").unwrap().guidance_start, Some(3.1));
}

#[test]
fn guidance_any_is_a_global_cooldown() {
    let cfg = GuidanceCfg {
        grace_mode: GraceMode::GuidanceAny,
        ..GuidanceCfg::default()
    };
    let (mut arb, rec) = arbiter(cfg);

    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(0.0).unwrap(), GuidanceAction::Show(id("tracking")));

    arb.observe("tracking", true, true, 0.1).unwrap();
    assert_eq!(arb.decide(0.1).unwrap(), GuidanceAction::Hide(id("tracking")));

    arb.observe("system_monitoring", true, false, 1.0).unwrap();
    for t in [1.0, 2.0, 2.9, 3.0] {
        assert_eq!(arb.decide(t).unwrap(), GuidanceAction::None, "t = {t}");
    }
    assert_eq!(arb.decide(3.1).unwrap(), GuidanceAction::Show(id("system_monitoring")));
    assert_eq!(rec.effects().len(), 3);
}

#[test]
fn longest_always_picks_the_older_failure() {
    let cfg = GuidanceCfg {
        break_ties: BreakTies::Longest,
        grace_period: 0.0,
        ..GuidanceCfg::default()
    };
    for seed in 0..10 {
        let rec = Recorder::default();
        let mut arb = GuidanceArbiter::builder(cfg.clone(), TaskId::standard_tasks())
            .actuator(rec)
            .rng(StdRng::seed_from_u64(seed))
            .build()
            .unwrap();
        arb.observe("tracking", true, false, 0.0).unwrap();
        arb.observe("resource_management", true, false, -5.0).unwrap();
        assert_eq!(arb.decide(0.5).unwrap(), GuidanceAction::Show(id("resource_management")));
    }
}

#[test]
fn acceptability_hides_regardless_of_attention() {
    let (mut arb, rec) = arbiter(mouse_cfg());
    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(3.5).unwrap(), GuidanceAction::Show(id("tracking")));

    // not attended, just fixed
    arb.observe("tracking", true, true, 3.6).unwrap();
    assert_eq!(arb.decide(3.6).unwrap(), GuidanceAction::Hide(id("tracking")));
    assert!(arb.guided_task().is_none());
    assert_eq!(arb.beliefs().get("tracking").unwrap().guidance_end, Some(3.6));

    assert_eq!(arb.decide(3.7).unwrap(), GuidanceAction::None);
    assert_eq!(rec.effects().len(), 2);
}

#[test]
fn attention_hides_while_still_unacceptable() {
    let (mut arb, rec) = arbiter(mouse_cfg());
    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(3.5).unwrap(), GuidanceAction::Show(id("tracking")));

    arb.on_attention_sample(AttentionSample::mouse(3.55, ["tracking-target", "tracking"]));
    assert_eq!(arb.decide(3.6).unwrap(), GuidanceAction::Hide(id("tracking")));
    assert!(!arb.beliefs().get("tracking").unwrap().is_acceptable);
    assert_eq!(arb.beliefs().get("tracking").unwrap().last_attended, Some(3.6));

    // still attended: not a candidate
    assert_eq!(arb.decide(3.7).unwrap(), GuidanceAction::None);
    assert_eq!(
        rec.effects(),
        vec![GuidanceAction::Show(id("tracking")), GuidanceAction::Hide(id("tracking"))]
    );
}

#[test]
fn attention_grace_mode_waits_after_looking_away() {
    let cfg = GuidanceCfg {
        attention_mode: AttentionMode::Mouse,
        grace_mode: GraceMode::Attention,
        ..GuidanceCfg::default()
    };
    let (mut arb, _rec) = arbiter(cfg);
    arb.observe("tracking", true, false, 0.0).unwrap();
    arb.on_attention_sample(AttentionSample::mouse(0.5, ["tracking"]));
    assert_eq!(arb.decide(1.0).unwrap(), GuidanceAction::None);

    arb.on_attention_sample(AttentionSample::mouse(1.5, ["background"]));
    assert_eq!(arb.decide(2.0).unwrap(), GuidanceAction::None);
    assert_eq!(arb.decide(3.9).unwrap(), GuidanceAction::None);
    assert_eq!(arb.decide(4.1).unwrap(), GuidanceAction::Show(id("tracking")));
}

#[test]
fn quiet_cycles_emit_nothing() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    for task in TaskId::standard_tasks() {
        arb.observe(task.as_str(), true, true, 0.0).unwrap();
    }
    for i in 0..50 {
        assert_eq!(arb.decide(i as f64 * 0.1).unwrap(), GuidanceAction::None);
    }
    assert!(rec.effects().is_empty());
    assert!(arb.counterfactual().effects().is_empty());
}

#[test]
fn end_to_end_two_failures_one_guided_no_flapping() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    arb.observe("tracking", true, false, 0.0).unwrap();
    arb.observe("system_monitoring", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(0.0).unwrap(), GuidanceAction::None);

    let shown = match arb.decide(3.5).unwrap() {
        GuidanceAction::Show(t) => t,
        other => panic!("expected show, got {other:?}"),
    };
    assert!(shown == id("tracking") || shown == id("system_monitoring"));
    assert_eq!(arb.guided_task(), Some(&shown));

    assert_eq!(arb.decide(3.6).unwrap(), GuidanceAction::None);
    assert_eq!(arb.guided_task(), Some(&shown));
    assert_eq!(rec.effects(), vec![GuidanceAction::Show(shown.clone())]);

    let guided: Vec<_> = arb.beliefs().iter().filter(|(_, r)| r.is_guided).collect();
    assert_eq!(guided.len(), 1);
}

#[test]
fn counterfactual_mode_never_reaches_real_actuators() {
    let cfg = GuidanceCfg {
        counter_factual: true,
        ..GuidanceCfg::default()
    };
    let (mut arb, rec) = arbiter(cfg);
    arb.observe("resource_management", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(4.0).unwrap(), GuidanceAction::Show(id("resource_management")));
    arb.observe("resource_management", true, true, 5.0).unwrap();
    assert_eq!(arb.decide(5.0).unwrap(), GuidanceAction::Hide(id("resource_management")));

    assert!(rec.effects().is_empty());
    assert_eq!(
        arb.counterfactual().effects(),
        &[
            GuidanceAction::Show(id("resource_management")),
            GuidanceAction::Hide(id("resource_management")),
        ]
    );
    let record = arb.beliefs().get("resource_management").unwrap();
    assert_eq!(record.guidance_start, Some(4.0));
    assert_eq!(record.guidance_end, Some(5.0));
}

#[test]
fn fixation_looks_back_three_cycles() {
    let (mut arb, _rec) = arbiter(GuidanceCfg::default());
    arb.on_attention_sample(AttentionSample::gaze(0.5, ["tracking"], true));

    for t in [0.0, 1.0, 2.0, 3.0] {
        arb.decide(t).unwrap();
        assert!(arb.attending().contains(&id("tracking")), "t = {t}");
    }
    arb.decide(4.0).unwrap();
    assert!(arb.attending().is_empty());
    assert_eq!(arb.beliefs().get("tracking").unwrap().last_attended, Some(3.0));
}

#[test]
fn saccades_do_not_count_as_fixation() {
    let (mut arb, _rec) = arbiter(GuidanceCfg::default());
    arb.decide(0.0).unwrap();
    arb.on_attention_sample(AttentionSample::gaze(0.5, ["tracking"], false));
    arb.decide(1.0).unwrap();
    assert!(arb.attending().is_empty());

    let cfg = GuidanceCfg {
        attention_mode: AttentionMode::Gaze,
        ..GuidanceCfg::default()
    };
    let (mut arb, _rec) = arbiter(cfg);
    arb.on_attention_sample(AttentionSample::gaze(0.5, ["tracking"], false));
    arb.decide(1.0).unwrap();
    assert!(arb.attending().contains(&id("tracking")));
}

#[test]
fn failing_actuator_propagates_and_keeps_state() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    arb.observe("tracking", true, false, 0.0).unwrap();

    rec.fail.set(true);
    assert!(matches!(arb.decide(3.5), Err(GuidanceError::Actuator { .. })));
    assert!(arb.guided_task().is_none());
    assert_eq!(arb.beliefs().get("tracking").unwrap().guidance_start, None);

    rec.fail.set(false);
    assert_eq!(arb.decide(3.6).unwrap(), GuidanceAction::Show(id("tracking")));
}

fn two_actuators(cfg: GuidanceCfg) -> (GuidanceArbiter, Recorder, Recorder) {
    let (a, b) = (Recorder::default(), Recorder::default());
    let arb = GuidanceArbiter::builder(cfg, TaskId::standard_tasks())
        .actuator(a.clone())
        .actuator(b.clone())
        .rng(StdRng::seed_from_u64(3))
        .build()
        .unwrap();
    (arb, a, b)
}

#[test]
fn every_actuator_sees_the_same_effects() {
    let (mut arb, a, b) = two_actuators(mouse_cfg());
    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(3.5).unwrap(), GuidanceAction::Show(id("tracking")));
    arb.on_attention_sample(AttentionSample::mouse(3.55, ["tracking"]));
    assert_eq!(arb.decide(3.6).unwrap(), GuidanceAction::Hide(id("tracking")));

    let expected = vec![GuidanceAction::Show(id("tracking")), GuidanceAction::Hide(id("tracking"))];
    assert_eq!(a.effects(), expected);
    assert_eq!(b.effects(), expected);
    assert!(arb.counterfactual().effects().is_empty());
}

#[test]
fn counterfactual_mode_skips_every_actuator() {
    let cfg = GuidanceCfg {
        counter_factual: true,
        ..mouse_cfg()
    };
    let (mut arb, a, b) = two_actuators(cfg);
    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(arb.decide(3.5).unwrap(), GuidanceAction::Show(id("tracking")));
    arb.observe("tracking", true, true, 4.0).unwrap();
    assert_eq!(arb.decide(4.0).unwrap(), GuidanceAction::Hide(id("tracking")));

    assert!(a.effects().is_empty());
    assert!(b.effects().is_empty());
    assert_eq!(arb.counterfactual().effects().len(), 2);
}

#[test]
fn rejected_show_is_withdrawn_from_earlier_actuators() {
    let cfg = GuidanceCfg {
        break_ties: BreakTies::Longest,
        ..GuidanceCfg::default()
    };
    let (mut arb, a, b) = two_actuators(cfg);
    arb.observe("tracking", true, false, 0.0).unwrap();
    arb.observe("system_monitoring", true, false, 0.5).unwrap();

    b.fail.set(true);
    assert!(matches!(arb.decide(3.6), Err(GuidanceError::Actuator { .. })));
    assert!(arb.guided_task().is_none());
    assert_eq!(arb.beliefs().get("tracking").unwrap().guidance_start, None);
    assert_eq!(
        a.effects(),
        vec![GuidanceAction::Show(id("tracking")), GuidanceAction::Hide(id("tracking"))]
    );
    assert!(b.effects().is_empty());

    // the host logs the error and keeps cycling
    b.fail.set(false);
    assert_eq!(arb.decide(3.7).unwrap(), GuidanceAction::Show(id("tracking")));
    assert_eq!(arb.decide(3.8).unwrap(), GuidanceAction::None);
    for rec in [&a, &b] {
        let shown = rec.effects().iter().filter(|e| matches!(e, GuidanceAction::Show(_))).count();
        let hidden = rec.effects().iter().filter(|e| matches!(e, GuidanceAction::Hide(_))).count();
        assert_eq!(shown - hidden, 1);
    }
    assert_eq!(b.effects(), vec![GuidanceAction::Show(id("tracking"))]);
}

#[test]
fn rejected_hide_keeps_the_task_guided_until_it_succeeds() {
    let (mut arb, a, b) = two_actuators(mouse_cfg());
    arb.observe("tracking", true, false, 0.0).unwrap();
    arb.observe("system_monitoring", true, false, 0.0).unwrap();
    let shown = match arb.decide(3.5).unwrap() {
        GuidanceAction::Show(t) => t,
        other => panic!("expected show, got {other:?}"),
    };

    arb.observe(shown.as_str(), true, true, 4.0).unwrap();
    a.fail_hide.set(true);
    assert!(matches!(arb.decide(4.0), Err(GuidanceError::Actuator { .. })));
    // the other actuator still got the hide
    assert_eq!(b.effects().last(), Some(&GuidanceAction::Hide(shown.clone())));
    assert_eq!(arb.guided_task(), Some(&shown));
    assert_eq!(arb.beliefs().get(shown.as_str()).unwrap().guidance_end, None);

    // no second task is shown while the first is not hidden everywhere
    assert!(matches!(arb.decide(4.5), Err(GuidanceError::Actuator { .. })));
    assert_eq!(arb.guided_task(), Some(&shown));

    a.fail_hide.set(false);
    assert_eq!(arb.decide(5.0).unwrap(), GuidanceAction::Hide(shown.clone()));
    assert!(arb.guided_task().is_none());
    assert_eq!(a.effects(), vec![GuidanceAction::Show(shown.clone()), GuidanceAction::Hide(shown)]);
}

#[test]
fn belief_log_gets_a_snapshot_per_change() {
    let buf = SharedBuf::default();
    let mut arb = GuidanceArbiter::builder(GuidanceCfg::default(), TaskId::standard_tasks())
        .actuator(Recorder::default())
        .belief_log(JsonLinesBeliefLog::new(buf.clone()))
        .rng(StdRng::seed_from_u64(1))
        .build()
        .unwrap();
    let lines = |b: &SharedBuf| String::from_utf8(b.0.borrow().clone()).unwrap().lines().count();

    arb.decide(0.0).unwrap();
    let initial = lines(&buf);

    arb.observe("tracking", true, false, 0.0).unwrap();
    assert_eq!(lines(&buf), initial + 1);

    // same observation again: nothing changed
    arb.observe("tracking", true, false, 0.5).unwrap();
    arb.decide(0.5).unwrap();
    assert_eq!(lines(&buf), initial + 1);

    arb.decide(3.5).unwrap();
    assert_eq!(lines(&buf), initial + 2);
    let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
    let last = text.lines().last().unwrap();
    assert!(last.contains("\"guided_task\":\"tracking\""), "{last}");
}

#[test]
fn tick_polls_sources_then_decides() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    let mut sm = SubtaskAcceptability::system_monitoring();
    let tr = SubtaskAcceptability::tracking();

    sm.set_acceptable("system_monitoring.slider-2", false).unwrap();
    assert_eq!(arb.tick(0.0, &[&sm, &tr]).unwrap(), GuidanceAction::None);
    assert_eq!(arb.tick(3.5, &[&sm, &tr]).unwrap(), GuidanceAction::Show(id("system_monitoring")));

    sm.set_acceptable("system_monitoring.slider-2", true).unwrap();
    assert_eq!(arb.tick(4.0, &[&sm, &tr]).unwrap(), GuidanceAction::Hide(id("system_monitoring")));
    assert_eq!(rec.effects().len(), 2);
}

struct BrokenSource(TaskId);

impl AcceptabilitySource for BrokenSource {
    fn task(&self) -> &TaskId {
        &self.0
    }

    fn is_active(&self, _subtask: Option<&str>) -> Result<bool> {
        Ok(true)
    }

    fn is_acceptable(&self, _subtask: Option<&str>) -> Result<bool> {
        Err(GuidanceError::UnknownSubtask {
            task: self.0.to_string(),
            subtask: "tracking.box".to_string(),
        })
    }
}

#[test]
fn source_errors_are_not_swallowed() {
    let (mut arb, rec) = arbiter(GuidanceCfg::default());
    let broken = BrokenSource(id("tracking"));
    assert!(matches!(
        arb.tick(0.0, &[&broken]),
        Err(GuidanceError::UnknownSubtask { .. })
    ));
    assert!(rec.effects().is_empty());
}

#[test]
fn task_outside_the_monitored_set_is_rejected() {
    let rec = Recorder::default();
    let mut arb = GuidanceArbiter::builder(GuidanceCfg::default(), vec![id("tracking")])
        .actuator(rec)
        .build()
        .unwrap();
    assert!(matches!(
        arb.observe("system_monitoring", true, false, 0.0),
        Err(GuidanceError::UnknownTask(_))
    ));
    // samples on unmonitored elements are ignored
    arb.decide(0.0).unwrap();
    arb.on_attention_sample(AttentionSample::fixation(0.1, ["system_monitoring"]));
    arb.decide(0.2).unwrap();
    assert!(arb.attending().is_empty());
}
