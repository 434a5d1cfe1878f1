#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use phcal_core::{
    CalPoint, ConsoleClosed, StabilityCfg, StabilityMode, TimingCfg, Workflow, WorkflowState,
};
use phcal_traits::clock::test_clock::TestClock;
use phcal_traits::{Console, SensorBus};

type ReadFn = Box<dyn FnMut(u32) -> Result<String, String>>;

/// Reference solution for the point the bus is currently waiting on.
pub fn reference_for(points: u32) -> f64 {
    CalPoint::SEQUENCE[(points as usize).min(2)].reference_ph()
}

/// Readings sit exactly on the reference solution of the pending point.
pub fn steady() -> ReadFn {
    Box::new(|points| Ok(format!("{:.2}", reference_for(points))))
}

/// Alternates ±0.02 pH around the reference; never stable.
pub fn noisy() -> ReadFn {
    let mut n = 0u32;
    Box::new(move |points| {
        n += 1;
        let delta = if n % 2 == 0 { 0.02 } else { -0.02 };
        Ok(format!("{:.2}", reference_for(points) + delta))
    })
}

/// Steady for points before `point`, noisy from `point` on.
pub fn stalls_at(point: CalPoint) -> ReadFn {
    let idx = CalPoint::SEQUENCE
        .iter()
        .position(|p| *p == point)
        .unwrap_or(0) as u32;
    let mut steady = steady();
    let mut noisy = noisy();
    Box::new(move |points| {
        if points < idx {
            steady(points)
        } else {
            noisy(points)
        }
    })
}

struct BusState {
    log: Vec<String>,
    points: u32,
    cal_status: Result<String, String>,
    slope_before: String,
    slope_after: String,
    reads: ReadFn,
    overrides: HashMap<String, Result<String, String>>,
    pending: Option<Result<String, String>>,
}

/// Scripted EZO circuit recording every command written to it.
#[derive(Clone)]
pub struct ScriptedBus {
    state: Rc<RefCell<BusState>>,
}

impl Default for ScriptedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                log: Vec::new(),
                points: 0,
                cal_status: Ok("?CAL,0".into()),
                slope_before: "100.0,100.0,0.00".into(),
                slope_after: "99.8,100.1,-0.50".into(),
                reads: steady(),
                overrides: HashMap::new(),
                pending: None,
            })),
        }
    }

    pub fn with_cal_status(self, status: &str) -> Self {
        self.state.borrow_mut().cal_status = Ok(status.into());
        self
    }

    pub fn with_failing_status(self) -> Self {
        self.state.borrow_mut().cal_status = Err("i2c bus error".into());
        self
    }

    pub fn with_slopes(self, before: &str, after: &str) -> Self {
        {
            let mut st = self.state.borrow_mut();
            st.slope_before = before.into();
            st.slope_after = after.into();
        }
        self
    }

    pub fn with_reads(self, reads: ReadFn) -> Self {
        self.state.borrow_mut().reads = reads;
        self
    }

    /// Fixed answer for `command`, taking precedence over the model.
    pub fn respond(self, command: &str, response: Result<&str, &str>) -> Self {
        self.state.borrow_mut().overrides.insert(
            command.into(),
            response.map(str::to_string).map_err(str::to_string),
        );
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    pub fn position(&self, command: &str) -> Option<usize> {
        self.state.borrow().log.iter().position(|c| c == command)
    }

    pub fn last(&self) -> Option<String> {
        self.state.borrow().log.last().cloned()
    }
}

impl SensorBus for ScriptedBus {
    fn write(&mut self, command: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut st = self.state.borrow_mut();
        st.log.push(command.to_string());
        let response = if let Some(r) = st.overrides.get(command) {
            r.clone()
        } else {
            match command {
                "R" => {
                    let points = st.points;
                    (st.reads)(points)
                }
                "i" => Ok("?i,pH,2.16".into()),
                "Cal,?" => st.cal_status.clone(),
                "Slope,?" => Ok(format!(
                    "?Slope,{}",
                    if st.points >= 3 {
                        &st.slope_after
                    } else {
                        &st.slope_before
                    }
                )),
                "Cal,clear" => {
                    st.points = 0;
                    Ok(String::new())
                }
                c if c.starts_with("Cal,") => {
                    st.points += 1;
                    Ok(String::new())
                }
                other => Err(format!("syntax error: {other}")),
            }
        };
        st.pending = Some(response);
        Ok(())
    }

    fn read_response(&mut self) -> Result<String, Box<dyn Error + Send + Sync>> {
        match self.state.borrow_mut().pending.take() {
            Some(Ok(s)) => Ok(s),
            Some(Err(e)) => Err(e.into()),
            None => Err("no data".into()),
        }
    }
}

struct ConsoleState {
    input: VecDeque<String>,
    output: Vec<String>,
    close_when_drained: bool,
}

/// In-memory console: queued input lines, captured output.
#[derive(Clone)]
pub struct ScriptConsole {
    state: Rc<RefCell<ConsoleState>>,
}

impl Default for ScriptConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptConsole {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ConsoleState {
                input: VecDeque::new(),
                output: Vec::new(),
                close_when_drained: false,
            })),
        }
    }

    /// Report end of input once the queued lines are consumed.
    pub fn closing(self) -> Self {
        self.state.borrow_mut().close_when_drained = true;
        self
    }

    pub fn push(&self, line: &str) {
        self.state.borrow_mut().input.push_back(line.to_string());
    }

    pub fn output(&self) -> Vec<String> {
        self.state.borrow().output.clone()
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.state.borrow().output.iter().any(|l| l.contains(needle))
    }

    pub fn last(&self) -> Option<String> {
        self.state.borrow().output.last().cloned()
    }
}

impl Console for ScriptConsole {
    fn try_read_line(&mut self) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let mut st = self.state.borrow_mut();
        match st.input.pop_front() {
            Some(line) => Ok(Some(line)),
            None if st.close_when_drained => Err(Box::new(ConsoleClosed)),
            None => Ok(None),
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.state.borrow_mut().output.push(text.to_string());
        Ok(())
    }
}

pub struct Rig {
    pub wf: Workflow,
    pub bus: ScriptedBus,
    pub console: ScriptConsole,
    pub clock: TestClock,
}

pub fn windowed() -> StabilityCfg {
    StabilityCfg::default()
}

pub fn exact_repeat() -> StabilityCfg {
    StabilityCfg {
        mode: StabilityMode::ExactRepeat,
        ..StabilityCfg::default()
    }
}

pub fn rig(bus: ScriptedBus, stability: StabilityCfg) -> Rig {
    rig_with(bus, ScriptConsole::new(), stability)
}

pub fn rig_with(bus: ScriptedBus, console: ScriptConsole, stability: StabilityCfg) -> Rig {
    let clock = TestClock::new();
    let wf = Workflow::builder()
        .with_bus(bus.clone())
        .with_console(console.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_stability(stability)
        .with_timing(TimingCfg::default())
        .build()
        .expect("valid workflow");
    Rig {
        wf,
        bus,
        console,
        clock,
    }
}

impl Rig {
    pub fn send(&mut self, line: &str) {
        self.wf.handle_line(line).expect("console write");
    }

    pub fn tick(&mut self) {
        self.wf.tick().expect("tick");
    }

    /// Tick until `state` is reached; panics after `max` ticks.
    pub fn tick_until(&mut self, state: WorkflowState, max: usize) {
        for _ in 0..max {
            if self.wf.state() == state {
                return;
            }
            self.tick();
        }
        assert_eq!(self.wf.state(), state, "not reached within {max} ticks");
    }

    /// `start`, prior check, and confirm every point before `point`, ending
    /// with `point` confirmed and stabilizing.
    pub fn confirm_through(&mut self, point: CalPoint) {
        self.send("start");
        self.tick_until(WorkflowState::Mid, 5);
        for p in CalPoint::SEQUENCE {
            self.tick_until(p.into(), 200);
            self.send("ok");
            if p == point {
                return;
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}
