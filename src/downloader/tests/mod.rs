use super::test_helpers::{
    FakeEngine, FakeMode, audio_only, collect_events_until_terminal, combined,
    create_test_downloader, create_test_downloader_with, progress, video_only, wait_for_running,
    wait_for_terminal,
};
use super::*;
use crate::config::PurgePolicy;
use crate::types::{JobStatus, has_audio_extension};
use std::time::Duration;
