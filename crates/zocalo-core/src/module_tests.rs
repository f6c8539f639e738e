use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::*;

type EventLog = Rc<RefCell<Vec<String>>>;

struct FakeModule {
    name: String,
    handle: usize,
    log: EventLog,
    fail_start: bool,
}

impl Module for FakeModule {
    fn start(&mut self, _ctx: &ShellContext) -> ShellResult<()> {
        if self.fail_start {
            return Err(format!("{} refused to start", self.name).into());
        }
        self.log.borrow_mut().push(format!("start {}", self.name));
        Ok(())
    }

    fn stop(&mut self) {
        self.log.borrow_mut().push(format!("stop {}", self.name));
    }

    fn handle(&self) -> usize {
        self.handle
    }
}

struct FakeFactory {
    next_handle: Cell<usize>,
    log: EventLog,
    /// Paths whose modules fail in start().
    broken: Vec<PathBuf>,
}

impl FakeFactory {
    fn new(log: EventLog) -> Self {
        Self {
            next_handle: Cell::new(1000),
            log,
            broken: Vec::new(),
        }
    }
}

impl ModuleFactory for FakeFactory {
    fn create(&self, path: &Path, _flags: u32) -> ShellResult<Box<dyn Module>> {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        Ok(Box::new(FakeModule {
            name: path.display().to_string(),
            handle,
            log: self.log.clone(),
            fail_start: self.broken.iter().any(|p| p == path),
        }))
    }
}

fn ctx() -> ShellContext {
    ShellContext {
        main_window: 1,
        app_path: PathBuf::from(r"C:\shell"),
        rc_path: PathBuf::from(r"C:\shell\step.rc"),
    }
}

fn manager() -> (ModuleManager, EventLog) {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mgr = ModuleManager::new(Box::new(FakeFactory::new(log.clone())));
    (mgr, log)
}

#[test]
fn kind_selection_is_a_pure_function_of_flags() {
    assert_eq!(ModuleKind::from_flags(0), ModuleKind::Native);
    assert_eq!(ModuleKind::from_flags(MODULE_CLR), ModuleKind::Clr);
    assert_eq!(ModuleKind::from_flags(MODULE_CORECLR), ModuleKind::CoreClr);
    // Unrelated bits default to native.
    assert_eq!(ModuleKind::from_flags(0x8000), ModuleKind::Native);
}

#[test]
fn load_then_unload_round_trip() {
    let (mut mgr, log) = manager();
    let path = Path::new(r"C:\modules\taskbar.dll");

    mgr.load_module(&ctx(), path, 0).unwrap();
    assert_eq!(mgr.module_count(), 1);

    assert!(mgr.quit_module(path));
    assert_eq!(mgr.module_count(), 0);
    assert_eq!(
        *log.borrow(),
        vec![r"start C:\modules\taskbar.dll", r"stop C:\modules\taskbar.dll"]
    );
}

#[test]
fn unloading_a_never_loaded_path_is_a_noop() {
    let (mut mgr, _log) = manager();
    assert!(!mgr.quit_module(Path::new(r"C:\modules\ghost.dll")));
    assert!(!mgr.quit_module_by_handle(12345));
}

#[test]
fn duplicate_path_load_is_rejected() {
    let (mut mgr, _log) = manager();
    let path = Path::new(r"C:\modules\taskbar.dll");

    mgr.load_module(&ctx(), path, 0).unwrap();
    let err = mgr.load_module(&ctx(), path, 0).unwrap_err();
    assert!(matches!(err, ModuleError::AlreadyLoaded(_)));
    assert_eq!(mgr.module_count(), 1);
}

#[test]
fn failed_start_does_not_register_the_module() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut factory = FakeFactory::new(log.clone());
    factory.broken.push(PathBuf::from(r"C:\modules\bad.dll"));
    let mut mgr = ModuleManager::new(Box::new(factory));

    let err = mgr
        .load_module(&ctx(), Path::new(r"C:\modules\bad.dll"), 0)
        .unwrap_err();
    assert!(matches!(err, ModuleError::LoadFailed { .. }));
    assert_eq!(mgr.module_count(), 0);
}

#[test]
fn reload_keeps_identity_and_restarts() {
    let (mut mgr, log) = manager();
    let path = Path::new(r"C:\modules\clock.dll");
    mgr.load_module(&ctx(), path, MODULE_CLR).unwrap();

    mgr.enum_modules(|p, flags| {
        assert_eq!(p, path);
        assert_eq!(flags, MODULE_CLR);
        ControlFlow::Continue(())
    });

    // 1000 is the first handle the fake factory hands out.
    mgr.reload_module(&ctx(), 1000).unwrap();

    assert_eq!(mgr.module_count(), 1);
    assert_eq!(
        *log.borrow(),
        vec![
            r"start C:\modules\clock.dll",
            r"stop C:\modules\clock.dll",
            r"start C:\modules\clock.dll"
        ]
    );
}

#[test]
fn reload_of_unknown_handle_fails() {
    let (mut mgr, _log) = manager();
    assert!(matches!(
        mgr.reload_module(&ctx(), 77),
        Err(ModuleError::NotFound)
    ));
}

#[test]
fn enumeration_is_insertion_ordered_with_early_exit() {
    let (mut mgr, _log) = manager();
    for name in ["a.dll", "b.dll", "c.dll"] {
        mgr.load_module(&ctx(), Path::new(name), 0).unwrap();
    }

    let mut seen = Vec::new();
    let visited = mgr.enum_modules(|p, _| {
        seen.push(p.to_path_buf());
        if seen.len() == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(visited, 2);
    assert_eq!(seen, vec![PathBuf::from("a.dll"), PathBuf::from("b.dll")]);
}

#[test]
fn bulk_start_skips_broken_modules() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut factory = FakeFactory::new(log.clone());
    factory.broken.push(PathBuf::from("bad.dll"));
    let mut mgr = ModuleManager::new(Box::new(factory));

    let lines = vec![
        ModuleLine::parse("good.dll").unwrap(),
        ModuleLine::parse("bad.dll").unwrap(),
        ModuleLine::parse("also_good.dll coreclr").unwrap(),
    ];
    let running = mgr.start(&ctx(), &lines);
    assert_eq!(running, 2);
}

#[test]
fn bulk_stop_unloads_newest_first() {
    let (mut mgr, log) = manager();
    mgr.load_module(&ctx(), Path::new("a.dll"), 0).unwrap();
    mgr.load_module(&ctx(), Path::new("b.dll"), 0).unwrap();

    mgr.stop();
    assert_eq!(mgr.module_count(), 0);
    assert_eq!(
        *log.borrow(),
        vec!["start a.dll", "start b.dll", "stop b.dll", "stop a.dll"]
    );
}

#[test]
fn module_line_parses_flag_tags() {
    assert_eq!(
        ModuleLine::parse(r"C:\m\x.dll clr").unwrap(),
        ModuleLine {
            path: PathBuf::from(r"C:\m\x.dll"),
            flags: MODULE_CLR
        }
    );
    assert_eq!(ModuleLine::parse(r"C:\m\x.dll").unwrap().flags, 0);
    assert!(ModuleLine::parse("   ").is_none());
}
