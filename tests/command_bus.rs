use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use anyhow::anyhow;
use mini_cqrs_bus::{
    CancellationGuard, Command, CommandBus, CommandHandler, Context, CqrsError, LoggingMiddleware,
    Message, MessageType, Middleware, Next, Result,
};

type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct CreateUser {
    username: String,
}

impl Command for CreateUser {}

#[derive(Debug)]
struct DeleteUser {
    id: u32,
}

impl Command for DeleteUser {}

struct CreateUserHandler {
    journal: Journal,
}

impl CommandHandler for CreateUserHandler {
    type Command = CreateUser;

    fn handle(&self, command: &CreateUser) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("create {}", command.username));
        Ok(())
    }
}

struct FailingDeleteHandler;

impl CommandHandler for FailingDeleteHandler {
    type Command = DeleteUser;

    fn handle(&self, command: &DeleteUser) -> Result<()> {
        Err(anyhow!("user {} does not exist", command.id).into())
    }
}

// Claims to handle DeleteUser while its handle method takes CreateUser.
struct MislabelledHandler;

impl CommandHandler for MislabelledHandler {
    type Command = CreateUser;

    fn handle(&self, _command: &CreateUser) -> Result<()> {
        Ok(())
    }

    fn declared_type(&self) -> MessageType {
        MessageType::of::<DeleteUser>()
    }
}

struct Recorder {
    label: &'static str,
    journal: Journal,
}

impl Middleware<dyn Message, ()> for Recorder {
    fn execute(
        &self,
        ctx: &Context,
        message: &dyn Message,
        next: Next<'_, dyn Message, ()>,
    ) -> Result<()> {
        self.journal.lock().unwrap().push(format!("{} before", self.label));
        let result = next.run(ctx, message);
        self.journal.lock().unwrap().push(format!("{} after", self.label));
        result
    }
}

struct Forbid;

impl Middleware<dyn Message, ()> for Forbid {
    fn execute(
        &self,
        _ctx: &Context,
        message: &dyn Message,
        _next: Next<'_, dyn Message, ()>,
    ) -> Result<()> {
        Err(anyhow!("{} is forbidden", message.message_type()).into())
    }
}

fn bus_with_create_handler(journal: &Journal) -> CommandBus {
    let bus = CommandBus::new();
    bus.register_handler(CreateUserHandler {
        journal: Arc::clone(journal),
    })
    .unwrap();
    bus
}

fn create(username: &str) -> CreateUser {
    CreateUser {
        username: username.to_string(),
    }
}

#[test]
fn dispatch_reaches_the_registered_handler() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);

    bus.dispatch(&create("jane")).unwrap();

    assert!(bus.handles::<CreateUser>());
    assert!(!bus.handles::<DeleteUser>());
    assert_eq!(*journal.lock().unwrap(), vec!["create jane"]);
}

#[test]
fn second_registration_for_a_type_fails_and_first_stays_active() {
    let first = Journal::default();
    let second = Journal::default();
    let bus = bus_with_create_handler(&first);

    let err = bus
        .register_handler(CreateUserHandler {
            journal: Arc::clone(&second),
        })
        .unwrap_err();
    bus.dispatch(&create("jane")).unwrap();

    assert!(matches!(err, CqrsError::AlreadyRegistered(t) if t == MessageType::of::<CreateUser>()));
    assert_eq!(first.lock().unwrap().len(), 1);
    assert!(second.lock().unwrap().is_empty());
    assert_eq!(bus.handler_count(), 1);
}

#[test]
fn mislabelled_handler_is_rejected() {
    let bus = CommandBus::new();

    let err = bus.register_handler(MislabelledHandler).unwrap_err();

    assert!(matches!(
        err,
        CqrsError::InvalidHandlerContract { declared, accepted }
            if declared == MessageType::of::<DeleteUser>()
                && accepted == MessageType::of::<CreateUser>()
    ));
    assert_eq!(bus.handler_count(), 0);
}

#[test]
fn unregistered_command_fails_without_touching_middlewares() {
    let journal = Journal::default();
    let bus = CommandBus::new();
    bus.use_middleware(Recorder {
        label: "a",
        journal: Arc::clone(&journal),
    });

    let err = bus.dispatch(&DeleteUser { id: 1 }).unwrap_err();

    assert!(matches!(err, CqrsError::HandlerNotFound(t) if t == MessageType::of::<DeleteUser>()));
    assert!(journal.lock().unwrap().is_empty());
}

#[test]
fn middlewares_wrap_the_handler_in_registration_order() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    for label in ["a", "b"] {
        bus.use_middleware(Recorder {
            label,
            journal: Arc::clone(&journal),
        });
    }

    bus.dispatch(&create("jane")).unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["a before", "b before", "create jane", "b after", "a after"]
    );
}

#[test]
fn short_circuiting_middleware_prevents_the_handler() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    bus.use_middleware(Forbid);

    let err = bus.dispatch(&create("jane")).unwrap_err();

    assert!(err.to_string().contains("is forbidden"));
    assert!(journal.lock().unwrap().is_empty());
}

#[test]
fn dispatch_without_middleware_skips_the_chain() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    bus.use_middleware(Forbid);

    bus.dispatch_without_middleware(&create("jane")).unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["create jane"]);
}

#[test]
fn handler_errors_reach_the_caller_unchanged() {
    let bus = CommandBus::new();
    bus.use_middleware(LoggingMiddleware::new("commands"));
    bus.register_handler(FailingDeleteHandler).unwrap();

    let err = bus.dispatch(&DeleteUser { id: 7 }).unwrap_err();

    assert!(matches!(err, CqrsError::Generic(_)));
    assert!(err.to_string().contains("user 7 does not exist"));
}

#[test]
fn cancelled_context_is_refused_by_the_guard() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    bus.use_middleware(CancellationGuard);
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let err = bus.dispatch_with_context(&ctx, &create("jane")).unwrap_err();

    assert!(matches!(err, CqrsError::Cancelled));
    assert!(journal.lock().unwrap().is_empty());
}

#[test]
fn erased_commands_route_by_their_concrete_type() {
    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    let commands: Vec<Box<dyn Command>> = vec![Box::new(create("a")), Box::new(create("b"))];

    for command in &commands {
        bus.dispatch(command.as_ref()).unwrap();
    }

    assert_eq!(*journal.lock().unwrap(), vec!["create a", "create b"]);
}

#[test]
fn handler_can_dispatch_through_its_own_bus() {
    struct CascadingDelete {
        bus: CommandBus,
    }

    impl CommandHandler for CascadingDelete {
        type Command = DeleteUser;

        fn handle(&self, command: &DeleteUser) -> Result<()> {
            self.bus.dispatch(&create(&format!("tombstone-{}", command.id)))
        }
    }

    let journal = Journal::default();
    let bus = bus_with_create_handler(&journal);
    bus.register_handler(CascadingDelete { bus: bus.clone() })
        .unwrap();

    bus.dispatch(&DeleteUser { id: 3 }).unwrap();

    assert_eq!(*journal.lock().unwrap(), vec!["create tombstone-3"]);
}

#[test]
fn handler_can_reconfigure_its_own_bus_mid_dispatch() {
    struct InstallAudit {
        bus: CommandBus,
        journal: Journal,
    }

    impl CommandHandler for InstallAudit {
        type Command = DeleteUser;

        fn handle(&self, command: &DeleteUser) -> Result<()> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("delete {}", command.id));
            self.bus.use_middleware(Recorder {
                label: "audit",
                journal: Arc::clone(&self.journal),
            });
            self.bus.register_handler(CreateUserHandler {
                journal: Arc::clone(&self.journal),
            })
        }
    }

    let journal = Journal::default();
    let bus = CommandBus::new();
    bus.register_handler(InstallAudit {
        bus: bus.clone(),
        journal: Arc::clone(&journal),
    })
    .unwrap();

    bus.dispatch(&DeleteUser { id: 1 }).unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["delete 1"]);

    bus.dispatch(&create("jane")).unwrap();
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["delete 1", "audit before", "create jane", "audit after"]
    );
}

#[test]
fn concurrent_dispatch_of_many_types_resolves_each_once() {
    macro_rules! counted_commands {
        ($($name:ident),*) => {
            $(
                #[derive(Debug)]
                struct $name;
                impl Command for $name {}
            )*
        };
    }

    counted_commands!(C0, C1, C2, C3, C4, C5, C6, C7);

    struct Counting<C> {
        hits: Arc<AtomicUsize>,
        marker: std::marker::PhantomData<fn() -> C>,
    }

    impl<C: Command> CommandHandler for Counting<C> {
        type Command = C;

        fn handle(&self, _command: &C) -> Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting<C: Command>(hits: &[Arc<AtomicUsize>], index: usize) -> Counting<C> {
        Counting {
            hits: Arc::clone(&hits[index]),
            marker: std::marker::PhantomData,
        }
    }

    let hits: Vec<Arc<AtomicUsize>> = (0..8).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let bus = CommandBus::new();
    bus.register_handler(counting::<C0>(&hits, 0)).unwrap();
    bus.register_handler(counting::<C1>(&hits, 1)).unwrap();
    bus.register_handler(counting::<C2>(&hits, 2)).unwrap();
    bus.register_handler(counting::<C3>(&hits, 3)).unwrap();
    bus.register_handler(counting::<C4>(&hits, 4)).unwrap();
    bus.register_handler(counting::<C5>(&hits, 5)).unwrap();
    bus.register_handler(counting::<C6>(&hits, 6)).unwrap();
    bus.register_handler(counting::<C7>(&hits, 7)).unwrap();

    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(C0),
        Box::new(C1),
        Box::new(C2),
        Box::new(C3),
        Box::new(C4),
        Box::new(C5),
        Box::new(C6),
        Box::new(C7),
    ];

    thread::scope(|scope| {
        for command in &commands {
            let bus = bus.clone();
            scope.spawn(move || bus.dispatch(command.as_ref()).unwrap());
        }
    });

    for counter in &hits {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn global_bus_is_a_single_shared_instance() {
    let handles: Vec<&'static CommandBus> = thread::scope(|scope| {
        let spawned: Vec<_> = (0..4).map(|_| scope.spawn(CommandBus::global)).collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for bus in &handles {
        assert!(std::ptr::eq(*bus, CommandBus::global()));
    }
}
