//! Recording MediaElement double

use async_trait::async_trait;
use rune_session::{MediaElement, MediaError};
use std::sync::Mutex;

#[derive(Debug)]
struct MediaLog {
    src: Option<String>,
    paused: bool,
    loads: Vec<String>,
    plays: usize,
    pauses: usize,
    rewinds: usize,
    blocked: bool,
}

pub struct RecordingMedia {
    log: Mutex<MediaLog>,
}

impl RecordingMedia {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(MediaLog {
                src: None,
                paused: true,
                loads: Vec::new(),
                plays: 0,
                pauses: 0,
                rewinds: 0,
                blocked: false,
            }),
        }
    }

    /// Make every play request fail the way an autoplay policy would
    pub fn block_playback(&self) {
        self.log.lock().unwrap().blocked = true;
    }

    pub fn src(&self) -> Option<String> {
        self.log.lock().unwrap().src.clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.log.lock().unwrap().loads.clone()
    }

    pub fn plays(&self) -> usize {
        self.log.lock().unwrap().plays
    }

    pub fn pauses(&self) -> usize {
        self.log.lock().unwrap().pauses
    }

    pub fn rewinds(&self) -> usize {
        self.log.lock().unwrap().rewinds
    }

    pub fn is_playing(&self) -> bool {
        !self.log.lock().unwrap().paused
    }
}

#[async_trait]
impl MediaElement for RecordingMedia {
    fn paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }

    fn ended(&self) -> bool {
        false
    }

    fn load(&self, src: &str) {
        let mut log = self.log.lock().unwrap();
        log.src = Some(src.to_string());
        log.loads.push(src.to_string());
        // loading a new source stops playback
        log.paused = true;
    }

    fn pause(&self) {
        let mut log = self.log.lock().unwrap();
        log.paused = true;
        log.pauses += 1;
    }

    fn rewind(&self) -> Result<(), MediaError> {
        self.log.lock().unwrap().rewinds += 1;
        Ok(())
    }

    async fn play(&self) -> Result<(), MediaError> {
        let mut log = self.log.lock().unwrap();
        log.plays += 1;
        if log.blocked {
            return Err(MediaError::Blocked("autoplay policy".to_string()));
        }
        log.paused = false;
        Ok(())
    }
}
