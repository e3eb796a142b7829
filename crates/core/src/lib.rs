pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod detection_filter;
        pub mod object_class;
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod identity_tracker;
        pub mod tracked_item;
    }
}

pub mod alerting {
    pub mod domain {
        pub mod alert_state_machine;
    }
}

pub mod pipeline {
    pub mod frame_processor;
    pub mod frame_result;
    pub mod pipeline_logger;
    pub mod watch_config;
    pub mod watch_video_use_case;
    pub mod infrastructure {
        pub mod prefetch_frame_source;
    }
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
        pub mod video_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_source;
        pub mod ffmpeg_writer;
        pub mod image_sequence_source;
    }
}

pub mod render {
    pub mod domain {
        pub mod frame_renderer;
    }
    pub mod infrastructure;
}
