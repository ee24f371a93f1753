// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;

use crate::Error;
use crate::append::escalation::Mail;
use crate::append::escalation::MailSender;
use crate::trap::Trap;

pub(crate) enum Task {
    Mail(Mail),
    // acknowledged once every task queued before it is done
    Flush(Sender<()>),
}

pub(crate) struct Worker {
    receiver: Receiver<Task>,
    sender: Box<dyn MailSender>,
    trap: Arc<dyn Trap>,
}

impl Worker {
    pub(crate) fn new(
        receiver: Receiver<Task>,
        sender: Box<dyn MailSender>,
        trap: Arc<dyn Trap>,
    ) -> Self {
        Self {
            receiver,
            sender,
            trap,
        }
    }

    pub(crate) fn run(self) {
        let Self {
            receiver,
            sender,
            trap,
        } = self;

        while let Ok(task) = receiver.recv() {
            match task {
                Task::Mail(mail) => {
                    if let Err(err) = sender.send(&mail) {
                        let err = Error::new("failed to send escalation mail")
                            .with_context("subject", &mail.subject)
                            .with_source(err);
                        trap.trap(&err);
                    }
                }
                Task::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct WorkerState(Option<State>);

#[derive(Debug)]
struct State {
    sender: Sender<Task>,
    handle: JoinHandle<()>,
}

impl WorkerState {
    pub(crate) fn new(sender: Sender<Task>, handle: JoinHandle<()>) -> Self {
        Self(Some(State { sender, handle }))
    }

    pub(crate) fn send_mail(&self, mail: Mail) -> Result<(), Error> {
        let Some(State { sender, .. }) = self.0.as_ref() else {
            return Err(Error::new("escalation worker has shut down"));
        };

        let subject = mail.subject.clone();
        match sender.try_send(Task::Mail(mail)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::new("escalation queue is full, mail dropped")
                .with_context("subject", subject)),
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::new("escalation worker has shut down, mail dropped")
                    .with_context("subject", subject))
            }
        }
    }

    // Blocks until the worker has sent everything queued so far.
    pub(crate) fn flush(&self) -> Result<(), Error> {
        let Some(State { sender, .. }) = self.0.as_ref() else {
            return Err(Error::new("escalation worker has shut down"));
        };

        let (done, wait) = crossbeam_channel::bounded(1);
        sender
            .send(Task::Flush(done))
            .map_err(|_| Error::new("escalation worker has shut down"))?;
        wait.recv()
            .map_err(|_| Error::new("escalation worker stopped before flushing"))
    }
}

impl Drop for WorkerState {
    fn drop(&mut self) {
        if let Some(State { sender, handle }) = self.0.take() {
            // the worker drains what is queued and exits once every sender is gone
            drop(sender);
            let _ = handle.join();
        }
    }
}
