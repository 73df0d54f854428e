//! Temporal detection confirmation and privacy-redacted evidence capture.
//!
//! Frames flow from a [`video::domain::frame_source::FrameSource`] through an
//! object detector and a sliding-window confirmer; confirmed events are saved
//! as JPEG snapshots with faces pixelated.

pub mod alerting {
    pub mod alert_namer;
    pub mod alert_writer;
    pub mod domain {
        pub mod clock;
        pub mod temporal_confirmer;
    }
    pub mod infrastructure {
        pub mod system_clock;
    }
}

pub mod config {
    pub mod monitor_config;
    pub mod paths;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod face_locator;
        pub mod hit_policy;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_loop;
    pub mod pipeline_logger;
    pub mod preview;
}

pub mod redaction {
    pub mod domain {
        pub mod frame_redactor;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod region;
    pub mod stream_info;
}

pub mod video {
    pub mod domain {
        pub mod camera_source;
        pub mod frame_source;
        pub mod image_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_source;
        pub mod jpeg_file_writer;
    }
}
