// tests/playback_tests.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout, Duration};

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId, PlaybackStatus, TrackCategory, TrackRecord, UserId};
use greeter_common::traits::{
    AudioEncoder, BlobStore, ChannelGate, CompletionReceiver, DocumentStore, EncodedAudio, FileStaging,
    StreamCompletion, VoiceConnection, VoiceConnector, VoiceSink,
};
use greeter_core::audio::PassthroughEncoder;
use greeter_core::playback::{Dispatcher, DispatcherHandle, GuildRegistry, PlaybackWorker, WorkerOutcome};
use greeter_core::services::{BlacklistService, TrackService, VoiceOutcome, VoiceStateService};
use greeter_core::staging::TempDirStaging;
use greeter_core::stores::{MemoryBlobStore, MemoryDocumentStore};

#[derive(Debug)]
struct FakeConnection {
    guild: GuildId,
    channel: ChannelId,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn guild_id(&self) -> GuildId {
        self.guild
    }
    fn channel_id(&self) -> ChannelId {
        self.channel
    }
    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }
}

struct FakeConnector;

#[async_trait]
impl VoiceConnector for FakeConnector {
    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<Arc<dyn VoiceConnection>, Error> {
        Ok(Arc::new(FakeConnection { guild, channel }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    EndOfStream,
    Failed,
    DropSender,
}

/// Records what was streamed and checks that no connection ever streams twice at once.
/// Each guild entry owns one connection, so this is the per-guild worker count.
struct RecordingSink {
    played: StdMutex<Vec<(GuildId, String)>>,
    active: StdMutex<HashMap<usize, usize>>,
    max_active: AtomicUsize,
    finishes: StdMutex<Vec<Finish>>,
    track_time: Duration,
}

impl RecordingSink {
    fn new(track_time: Duration) -> Self {
        Self {
            played: StdMutex::new(Vec::new()),
            active: StdMutex::new(HashMap::new()),
            max_active: AtomicUsize::new(0),
            finishes: StdMutex::new(Vec::new()),
            track_time,
        }
    }

    /// Completions to hand out before falling back to end of stream.
    fn script(self, finishes: Vec<Finish>) -> Self {
        *self.finishes.lock().unwrap() = finishes.into_iter().rev().collect();
        self
    }

    fn played_in(&self, guild: GuildId) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| *g == guild)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn total_played(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[async_trait]
impl VoiceSink for RecordingSink {
    async fn stream(
        &self,
        connection: Arc<dyn VoiceConnection>,
        audio: EncodedAudio,
    ) -> Result<CompletionReceiver, Error> {
        let guild = connection.guild_id();
        // The Arc is held until the stream ends, so the address is unique while active.
        let key = Arc::as_ptr(&connection) as *const () as usize;
        let body = std::fs::read_to_string(&audio.path).map_err(|e| Error::Stream(e.to_string()))?;
        {
            let mut active = self.active.lock().unwrap();
            let n = active.entry(key).or_default();
            *n += 1;
            self.max_active.fetch_max(*n, Ordering::SeqCst);
        }
        self.played.lock().unwrap().push((guild, body));
        let finish = self.finishes.lock().unwrap().pop().unwrap_or(Finish::EndOfStream);

        // The sink stops counting the stream as active right before completing it.
        sleep(self.track_time).await;
        *self.active.lock().unwrap().entry(key).or_default() -= 1;
        drop(connection);

        let (tx, rx) = oneshot::channel();
        match finish {
            Finish::EndOfStream => {
                let _ = tx.send(StreamCompletion::EndOfStream);
            }
            Finish::Failed => {
                let _ = tx.send(StreamCompletion::Failed("voice gateway hung up".into()));
            }
            Finish::DropSender => drop(tx),
        }
        Ok(rx)
    }
}

struct FailingEncoder;

#[async_trait]
impl AudioEncoder for FailingEncoder {
    async fn encode(&self, _source: &Path) -> Result<EncodedAudio, Error> {
        Err(Error::Stream("unsupported codec".into()))
    }
}

/// Writes its output to a scratch file, like a transcoder would.
struct CopyingEncoder {
    outputs: StdMutex<Vec<PathBuf>>,
}

#[async_trait]
impl AudioEncoder for CopyingEncoder {
    async fn encode(&self, source: &Path) -> Result<EncodedAudio, Error> {
        let out = source.with_extension("ogg");
        tokio::fs::copy(source, &out).await?;
        self.outputs.lock().unwrap().push(out.clone());
        Ok(EncodedAudio {
            path: out,
            temporary: true,
        })
    }
}

struct Harness {
    registry: Arc<GuildRegistry>,
    staging: Arc<TempDirStaging>,
    sink: Arc<RecordingSink>,
    worker: Arc<PlaybackWorker>,
    handle: DispatcherHandle,
    dispatcher: Option<Dispatcher>,
}

impl Harness {
    fn new(sink: RecordingSink, encoder: Arc<dyn AudioEncoder>) -> Self {
        let registry = Arc::new(GuildRegistry::new());
        let staging = Arc::new(TempDirStaging::new().unwrap());
        let sink = Arc::new(sink);
        let (dispatcher, handle) = Dispatcher::new();
        let worker = Arc::new(PlaybackWorker::new(
            registry.clone(),
            encoder,
            sink.clone(),
            staging.clone(),
            handle.clone(),
        ));
        Self {
            registry,
            staging,
            sink,
            worker,
            handle,
            dispatcher: Some(dispatcher),
        }
    }

    fn start(&mut self) {
        let dispatcher = self.dispatcher.take().expect("dispatcher already started");
        dispatcher.spawn(self.worker.clone());
    }

    async fn join(&self, guild: GuildId) {
        self.registry
            .get_or_create(guild, ChannelId(guild.get() * 100), &FakeConnector)
            .await
            .unwrap();
    }

    /// Stages `body` and enqueues it, signalling when the registry asks for it.
    async fn push(&self, guild: GuildId, body: &str) -> PathBuf {
        let path = self.staging.stage(Bytes::from(body.to_string())).await.unwrap();
        if self.registry.enqueue(guild, path.clone()).await.unwrap() {
            self.handle.signal(guild).unwrap();
        }
        path
    }

    async fn wait_for_played(&self, n: usize) {
        timeout(Duration::from_secs(10), async {
            while self.sink.total_played() < n {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("tracks were not played in time");
    }

    async fn wait_idle(&self, guild: GuildId) {
        timeout(Duration::from_secs(10), async {
            while self.registry.status(guild).await != Some(PlaybackStatus::NotPlaying) {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("guild never went idle");
    }
}

#[tokio::test]
async fn one_guild_plays_in_enqueue_order() {
    let mut h = Harness::new(RecordingSink::new(Duration::from_millis(5)), Arc::new(PassthroughEncoder));
    h.start();
    let guild = GuildId(1);
    h.join(guild).await;

    let mut staged = Vec::new();
    for i in 0..4 {
        staged.push(h.push(guild, &format!("track-{i}")).await);
    }
    h.wait_for_played(2).await;
    // More arrivals while the first batch is still draining.
    for i in 4..8 {
        staged.push(h.push(guild, &format!("track-{i}")).await);
    }
    h.wait_for_played(8).await;
    h.wait_idle(guild).await;

    let expected: Vec<String> = (0..8).map(|i| format!("track-{i}")).collect();
    assert_eq!(h.sink.played_in(guild), expected);
    assert_eq!(h.sink.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(h.registry.queued_len(guild).await, 0);
    assert!(staged.iter().all(|p| !p.exists()), "every staged file is deleted");
}

#[tokio::test]
async fn guilds_never_stream_concurrently_with_themselves() {
    let mut h = Harness::new(RecordingSink::new(Duration::from_millis(2)), Arc::new(PassthroughEncoder));
    h.start();
    let h = Arc::new(h);

    let guilds = [GuildId(11), GuildId(12), GuildId(13)];
    for g in guilds {
        h.join(g).await;
    }

    let mut tasks = Vec::new();
    for g in guilds {
        for i in 0..12 {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                h.push(g, &format!("{}-{i}", g.get())).await;
            }));
        }
    }
    for t in tasks {
        t.await.unwrap();
    }

    h.wait_for_played(guilds.len() * 12).await;
    for g in guilds {
        h.wait_idle(g).await;
        let mut played = h.sink.played_in(g);
        assert_eq!(played.len(), 12, "guild {g} played every track exactly once");
        played.sort();
        played.dedup();
        assert_eq!(played.len(), 12);
    }
    assert_eq!(h.sink.max_active.load(Ordering::SeqCst), 1);
}

/// Humans per guild, as the gateway cache would report them.
#[derive(Default)]
struct Occupancy {
    humans: StdMutex<HashMap<GuildId, usize>>,
}

impl Occupancy {
    fn arrive(&self, guild: GuildId) {
        *self.humans.lock().unwrap().entry(guild).or_default() += 1;
    }

    fn depart(&self, guild: GuildId) {
        let mut humans = self.humans.lock().unwrap();
        let n = humans.entry(guild).or_default();
        *n = n.saturating_sub(1);
    }
}

#[async_trait]
impl ChannelGate for Occupancy {
    async fn can_connect_and_speak(&self, _: GuildId, _: ChannelId) -> Result<bool, Error> {
        Ok(true)
    }
    async fn human_count(&self, guild: GuildId, _: ChannelId) -> Result<usize, Error> {
        Ok(self.humans.lock().unwrap().get(&guild).copied().unwrap_or(0))
    }
}

async fn seed_greetings(docs: &MemoryDocumentStore, blobs: &MemoryBlobStore, user: UserId) {
    for category in [TrackCategory::Intro, TrackCategory::Outro] {
        let name = format!("{user}-{category}");
        let record = serde_json::to_value(TrackRecord::new(name.clone(), user)).unwrap();
        docs.array_append(category.collection(), &user.to_string(), category.array_key(), vec![record])
            .await
            .unwrap();
        blobs
            .upload(&TrackRecord::blob_path(&name), Bytes::from(name.clone()), "audio/mpeg")
            .await
            .unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_leave_churn_never_doubles_a_guild_stream() {
    let mut h = Harness::new(RecordingSink::new(Duration::from_millis(3)), Arc::new(PassthroughEncoder));
    h.start();

    let docs = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let users = [UserId(1), UserId(2), UserId(3)];
    for user in users {
        seed_greetings(&docs, &blobs, user).await;
    }
    let occupancy = Arc::new(Occupancy::default());
    let tracks = Arc::new(TrackService::new(
        docs.clone(),
        blobs,
        h.staging.clone(),
        Duration::from_secs(60),
    ));
    let voice = Arc::new(VoiceStateService::new(
        h.registry.clone(),
        h.handle.clone(),
        tracks,
        Arc::new(BlacklistService::new(docs)),
        h.staging.clone(),
        occupancy.clone(),
        Arc::new(FakeConnector),
    ));

    let guilds = [GuildId(21), GuildId(22), GuildId(23)];
    let mut drivers = Vec::new();
    for guild in guilds {
        let voice = voice.clone();
        let occupancy = occupancy.clone();
        drivers.push(tokio::spawn(async move {
            let channel = ChannelId(guild.get() * 100);
            let mut events = Vec::new();
            // Four rounds of two members arriving and both leaving; every round
            // ends with the last human gone and the guild released.
            for round in 0..4 {
                for user in [users[round % 3], users[(round + 1) % 3]] {
                    occupancy.arrive(guild);
                    let voice = voice.clone();
                    events.push(tokio::spawn(async move { voice.on_voice_join(guild, channel, user).await }));
                    sleep(Duration::from_millis(1)).await;
                }
                for user in [users[round % 3], users[(round + 1) % 3]] {
                    occupancy.depart(guild);
                    let voice = voice.clone();
                    events.push(tokio::spawn(async move { voice.on_voice_leave(guild, channel, user).await }));
                    sleep(Duration::from_millis(2)).await;
                }
            }
            let mut released = 0;
            for event in events {
                if event.await.unwrap() == VoiceOutcome::Released {
                    released += 1;
                }
            }
            released
        }));
    }

    let mut releases = 0;
    for driver in drivers {
        releases += driver.await.unwrap();
    }
    assert!(releases > 0, "at least one guild was torn down mid-churn");

    // Every staged file is deleted once its track ends or its entry is torn down.
    timeout(Duration::from_secs(10), async {
        while std::fs::read_dir(h.staging.root()).unwrap().next().is_some() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("staged files were never cleaned up");

    assert!(h.sink.total_played() > 0);
    assert_eq!(h.sink.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn staged_file_is_deleted_after_end_of_stream() {
    let h = Harness::new(RecordingSink::new(Duration::ZERO), Arc::new(PassthroughEncoder));
    let guild = GuildId(2);
    h.join(guild).await;
    let staged = h.push(guild, "hello").await;

    let outcome = h.worker.run(guild).await;
    assert_eq!(outcome, WorkerOutcome::Completed { continued: false });
    assert!(!staged.exists());
    assert_eq!(h.registry.status(guild).await, Some(PlaybackStatus::NotPlaying));
}

#[tokio::test]
async fn staged_file_is_deleted_after_stream_error() {
    for finish in [Finish::Failed, Finish::DropSender] {
        let sink = RecordingSink::new(Duration::ZERO).script(vec![finish]);
        let h = Harness::new(sink, Arc::new(PassthroughEncoder));
        let guild = GuildId(3);
        h.join(guild).await;
        let staged = h.push(guild, "broken").await;

        let outcome = h.worker.run(guild).await;
        assert_eq!(outcome, WorkerOutcome::Dropped { continued: false }, "{finish:?}");
        assert!(!staged.exists(), "{finish:?}");
        assert_eq!(h.registry.status(guild).await, Some(PlaybackStatus::NotPlaying));
    }
}

#[tokio::test]
async fn staged_file_is_deleted_after_encoder_error() {
    let h = Harness::new(RecordingSink::new(Duration::ZERO), Arc::new(FailingEncoder));
    let guild = GuildId(4);
    h.join(guild).await;
    let staged = h.push(guild, "undecodable").await;

    assert_eq!(h.worker.run(guild).await, WorkerOutcome::Dropped { continued: false });
    assert!(!staged.exists());
    assert_eq!(h.sink.total_played(), 0);
}

#[tokio::test]
async fn encoder_scratch_output_is_removed() {
    let encoder = Arc::new(CopyingEncoder {
        outputs: StdMutex::new(Vec::new()),
    });
    let h = Harness::new(RecordingSink::new(Duration::ZERO), encoder.clone());
    let guild = GuildId(5);
    h.join(guild).await;
    let staged = h.push(guild, "transcode me").await;

    assert_eq!(h.worker.run(guild).await, WorkerOutcome::Completed { continued: false });
    assert!(!staged.exists());
    let outputs = encoder.outputs.lock().unwrap().clone();
    assert_eq!(outputs.len(), 1);
    assert!(!outputs[0].exists());
}

#[tokio::test]
async fn failed_track_does_not_stall_the_queue() {
    let sink = RecordingSink::new(Duration::from_millis(1)).script(vec![Finish::Failed]);
    let mut h = Harness::new(sink, Arc::new(PassthroughEncoder));
    h.start();
    let guild = GuildId(6);
    h.join(guild).await;

    let first = h.push(guild, "first").await;
    let second = h.push(guild, "second").await;
    h.wait_for_played(2).await;
    h.wait_idle(guild).await;

    assert_eq!(h.sink.played_in(guild), vec!["first", "second"]);
    assert!(!first.exists() && !second.exists());
}

#[tokio::test]
async fn signal_for_empty_queue_is_benign() {
    let h = Harness::new(RecordingSink::new(Duration::ZERO), Arc::new(PassthroughEncoder));
    assert_eq!(h.worker.run(GuildId(77)).await, WorkerOutcome::Idle);

    h.join(GuildId(78)).await;
    assert_eq!(h.worker.run(GuildId(78)).await, WorkerOutcome::Idle);
    assert_eq!(h.registry.status(GuildId(78)).await, Some(PlaybackStatus::NotPlaying));
}

#[tokio::test]
async fn teardown_mid_track_lets_the_worker_finish() {
    let h = Harness::new(RecordingSink::new(Duration::from_millis(20)), Arc::new(PassthroughEncoder));
    let guild = GuildId(9);
    h.join(guild).await;
    let playing = h.push(guild, "now").await;
    h.push(guild, "later").await;

    let worker = h.worker.clone();
    let run = tokio::spawn(async move { worker.run(guild).await });
    sleep(Duration::from_millis(5)).await;
    let released = h.registry.remove(guild).await.expect("guild was registered");
    assert_eq!(released.pending.len(), 1);

    assert_eq!(run.await.unwrap(), WorkerOutcome::Completed { continued: false });
    assert!(!playing.exists());
    assert!(!h.registry.contains(guild).await);
}

#[tokio::test]
async fn dispatcher_stops_on_shutdown() {
    let h = Harness::new(RecordingSink::new(Duration::ZERO), Arc::new(PassthroughEncoder));
    let (dispatcher, handle) = Dispatcher::new();
    let task = dispatcher.spawn(h.worker.clone());
    handle.shutdown();
    timeout(Duration::from_secs(1), task)
        .await
        .expect("dispatcher loop exits after shutdown")
        .unwrap();
    assert!(handle.signal(GuildId(1)).is_err());
}
