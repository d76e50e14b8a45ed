#![allow(dead_code)]

use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use vcall_filter_graph::{DataType, FilterError, FilterFactory, GraphEvent, MediaUnit, Stage};

/// Forwards units, changing their kind from `input` to `output`
pub(crate) struct Transcode {
    pub(crate) name: &'static str,
    pub(crate) input: DataType,
    pub(crate) output: DataType,
    pub(crate) fail_init: bool,
}

impl Transcode {
    pub(crate) fn new(name: &'static str, input: DataType, output: DataType) -> Box<dyn Stage> {
        Box::new(Self {
            name,
            input,
            output,
            fail_init: false,
        })
    }
}

impl Stage for Transcode {
    fn name(&self) -> &str {
        self.name
    }

    fn input_type(&self) -> DataType {
        self.input
    }

    fn output_type(&self) -> DataType {
        self.output
    }

    fn init(&mut self) -> Result<(), FilterError> {
        if self.fail_init {
            Err(FilterError::Init("no such device".into()))
        } else {
            Ok(())
        }
    }

    fn process(&mut self, unit: MediaUnit) -> Result<Vec<MediaUnit>, FilterError> {
        Ok(vec![unit.with_payload(self.output, unit.payload.clone())])
    }
}

/// Reports every received unit together with its filter name
pub(crate) struct Sink {
    pub(crate) name: &'static str,
    pub(crate) input: DataType,
    pub(crate) received: mpsc::Sender<(&'static str, MediaUnit)>,
}

impl Sink {
    pub(crate) fn new(
        name: &'static str,
        input: DataType,
        received: &mpsc::Sender<(&'static str, MediaUnit)>,
    ) -> Box<dyn Stage> {
        Box::new(Self {
            name,
            input,
            received: received.clone(),
        })
    }
}

impl Stage for Sink {
    fn name(&self) -> &str {
        self.name
    }

    fn input_type(&self) -> DataType {
        self.input
    }

    fn output_type(&self) -> DataType {
        DataType::None
    }

    fn process(&mut self, unit: MediaUnit) -> Result<Vec<MediaUnit>, FilterError> {
        let _ = self.received.send((self.name, unit));
        Ok(vec![])
    }
}

pub(crate) struct TestFactory {
    pub(crate) received: mpsc::Sender<(&'static str, MediaUnit)>,
    pub(crate) camera: bool,
    pub(crate) fail_video_encoder: bool,
}

impl TestFactory {
    pub(crate) fn new() -> (Self, mpsc::Receiver<(&'static str, MediaUnit)>) {
        let (received, rx) = mpsc::channel();

        let factory = Self {
            received,
            camera: true,
            fail_video_encoder: false,
        };

        (factory, rx)
    }
}

impl FilterFactory for TestFactory {
    fn camera(&mut self) -> Option<Box<dyn Stage>> {
        self.camera
            .then(|| Transcode::new("camera", DataType::None, DataType::Rgb32Video))
    }

    fn microphone(&mut self) -> Option<Box<dyn Stage>> {
        Some(Transcode::new(
            "microphone",
            DataType::None,
            DataType::RawAudio,
        ))
    }

    fn video_encoder(&mut self) -> Box<dyn Stage> {
        Box::new(Transcode {
            name: "video-encoder",
            input: DataType::Yuv420Video,
            output: DataType::EncodedVideo,
            fail_init: self.fail_video_encoder,
        })
    }

    fn audio_encoder(&mut self) -> Box<dyn Stage> {
        Transcode::new("audio-encoder", DataType::RawAudio, DataType::EncodedAudio)
    }

    fn video_decoder(&mut self, _: u32) -> Box<dyn Stage> {
        Transcode::new("video-decoder", DataType::EncodedVideo, DataType::Yuv420Video)
    }

    fn audio_decoder(&mut self, _: u32) -> Box<dyn Stage> {
        Transcode::new("audio-decoder", DataType::EncodedAudio, DataType::RawAudio)
    }

    fn video_display(&mut self, session: Option<u32>) -> Box<dyn Stage> {
        let name = if session.is_some() {
            "display"
        } else {
            "self-view"
        };

        Sink::new(name, DataType::Rgb32Video, &self.received)
    }

    fn audio_output(&mut self, _: u32) -> Box<dyn Stage> {
        Sink::new("speaker", DataType::RawAudio, &self.received)
    }
}

/// 2x2 frame as delivered by the camera
pub(crate) fn rgb_frame() -> MediaUnit {
    MediaUnit::video(DataType::Rgb32Video, vec![200; 16], 2, 2, 30)
}

/// Wait until a sink named `name` received a unit
pub(crate) fn wait_for(
    received: &mpsc::Receiver<(&'static str, MediaUnit)>,
    name: &str,
) -> MediaUnit {
    loop {
        let (sink, unit) = received
            .recv_timeout(Duration::from_secs(5))
            .expect("no unit arrived");

        if sink == name {
            return unit;
        }
    }
}

pub(crate) fn drain(events: &mut tokio_mpsc::UnboundedReceiver<GraphEvent>) -> Vec<GraphEvent> {
    let mut drained = vec![];

    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }

    drained
}
