pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod ffmpeg_capture;
        pub mod image_source;
    }
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod inference {
    pub mod domain {
        pub mod emotion;
        pub mod emotion_classifier;
        pub mod inference_executor;
        pub mod tensor;
    }
    pub mod infrastructure {
        pub mod cloud_face_client;
        pub mod inline_inference_executor;
        pub mod scoring_client;
        pub mod threaded_inference_executor;
    }
}

pub mod rendering {
    pub mod domain {
        pub mod overlay_renderer;
    }
    pub mod infrastructure;
}

pub mod output {
    pub mod domain {
        pub mod frame_sink;
    }
    pub mod infrastructure {
        pub mod snapshot_sink;
    }
}

pub mod pipeline {
    pub mod classify_image_use_case;
    pub mod display_state;
    pub mod frame_pipeline;
    pub mod pipeline_logger;
}

#[cfg(test)]
mod test_support;
