////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::{
    mem::take,
    sync::mpsc::{channel, sync_channel, Receiver, SendError, Sender},
    thread::{Builder, JoinHandle},
};

use log::{error, trace};

use crate::report::{system_panic, ENGINE_LOG};

/// A stateful job handler owned by a single thread.
pub(super) trait Task: Sized + 'static {
    type Config: Sized + Send + 'static;

    type Message: Sized + Send + 'static;

    fn init(config: Self::Config) -> Self;

    fn handle(&mut self, message: Self::Message);

    /// Spawns a dedicated thread that owns the task.
    ///
    /// If the thread cannot be spawned, returns the task initialized in the
    /// current thread instead.
    fn spawn(
        name: impl AsRef<str>,
        config: Self::Config,
    ) -> Result<TaskHandle<Self::Message>, Self> {
        let name = name.as_ref();
        let (init_sender, init_receiver) = sync_channel(1);
        let (commands_sender, commands_receiver) = channel();

        let result = {
            let name = String::from(name);

            Builder::new().name(name.clone()).spawn(move || {
                let initializer = TaskThreadInitializer::<Self> {
                    name,
                    init_receiver,
                    commands_receiver,
                };

                let Some(executor) = initializer.init() else {
                    return;
                };

                executor.run();
            })
        };

        match result {
            Ok(handle) => {
                if let Err(SendError(config)) = init_sender.send(config) {
                    error!(target: ENGINE_LOG, "{name} Thread config channel disconnected.");
                    return Err(Self::init(config));
                }

                drop(init_sender);

                Ok(TaskHandle {
                    inner: Some((commands_sender, handle)),
                })
            }

            Err(error) => {
                error!(target: ENGINE_LOG, "{name} Thread creation failure. {error}");
                Err(Self::init(config))
            }
        }
    }
}

/// An owning handle of a task thread.
///
/// Dropping the handle finishes the thread and waits until it exits.
pub(super) struct TaskHandle<M: Send + 'static> {
    inner: Option<(Sender<TaskThreadCommand<M>>, JoinHandle<()>)>,
}

impl<M: Send + 'static> Drop for TaskHandle<M> {
    fn drop(&mut self) {
        let Some((sender, handle)) = take(&mut self.inner) else {
            return;
        };

        let _ = sender.send(TaskThreadCommand::Finish);

        drop(sender);

        let name = String::from(handle.thread().name().unwrap_or(""));

        trace!(target: ENGINE_LOG, "{name} Thread join...");

        match handle.join() {
            Ok(()) => {
                trace!(target: ENGINE_LOG, "{name} Thread released.");
            }

            Err(_) => {
                error!(target: ENGINE_LOG, "{name} Thread release failure.");
            }
        }
    }
}

impl<M: Send + 'static> TaskHandle<M> {
    /// Sends the `message` to the task thread.
    ///
    /// Returns the message back if the thread is not running.
    pub(super) fn send(&self, message: M) -> Result<(), M> {
        let Some((sender, _)) = &self.inner else {
            system_panic!("Missing task handle state.");
        };

        match sender.send(TaskThreadCommand::Handle(message)) {
            Ok(()) => Ok(()),

            Err(SendError(TaskThreadCommand::Handle(message))) => {
                error!(target: ENGINE_LOG, "Task channel closed.");
                Err(message)
            }

            Err(SendError(TaskThreadCommand::Finish)) => {
                system_panic!("Unexpected thread command.")
            }
        }
    }
}

pub(super) enum TaskThreadCommand<M> {
    Handle(M),
    Finish,
}

struct TaskThreadInitializer<T: Task> {
    name: String,
    init_receiver: Receiver<T::Config>,
    commands_receiver: Receiver<TaskThreadCommand<T::Message>>,
}

impl<T: Task> TaskThreadInitializer<T> {
    fn init(self) -> Option<TaskThreadExecutor<T>> {
        let Ok(config) = self.init_receiver.recv() else {
            error!(target: ENGINE_LOG, "{} Thread was not initialized.", self.name);
            return None;
        };

        drop(self.init_receiver);

        let task = T::init(config);

        trace!(target: ENGINE_LOG, "{} Thread initialized.", self.name);

        Some(TaskThreadExecutor {
            name: self.name,
            commands_receiver: self.commands_receiver,
            task,
        })
    }
}

struct TaskThreadExecutor<T: Task> {
    name: String,
    commands_receiver: Receiver<TaskThreadCommand<T::Message>>,
    task: T,
}

impl<T: Task> TaskThreadExecutor<T> {
    fn run(mut self) {
        loop {
            let Ok(command) = self.commands_receiver.recv() else {
                break;
            };

            match command {
                TaskThreadCommand::Handle(message) => self.task.handle(message),
                TaskThreadCommand::Finish => break,
            }
        }

        trace!(target: ENGINE_LOG, "{} Thread finished.", self.name);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{sync_channel, SyncSender};

    use crate::engine::tasks::Task;

    struct Doubler {
        factor: u64,
    }

    impl Task for Doubler {
        type Config = u64;
        type Message = (u64, SyncSender<u64>);

        fn init(factor: Self::Config) -> Self {
            Self { factor }
        }

        fn handle(&mut self, (value, reply): Self::Message) {
            let _ = reply.send(value * self.factor);
        }
    }

    #[test]
    fn test_task_thread() {
        let Ok(handle) = Doubler::spawn("doubler", 2) else {
            panic!("Thread spawn failure.");
        };

        for value in 0..10 {
            let (sender, receiver) = sync_channel(1);

            assert!(handle.send((value, sender)).is_ok());
            assert_eq!(receiver.recv().unwrap(), value * 2);
        }

        drop(handle);
    }
}
