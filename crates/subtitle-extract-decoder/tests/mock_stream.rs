use subtitle_extract_decoder::{Backend, Configuration};
use tokio_stream::StreamExt;

#[tokio::test(flavor = "multi_thread")]
async fn mock_backend_produces_stream() {
    let config = Configuration {
        backend: Backend::Mock,
        ..Configuration::default()
    };
    let provider = config.create_provider().expect("mock backend available");
    let mut stream = provider.open();
    let mut frames = Vec::new();
    while let Some(frame) = stream.next().await {
        frames.push(frame.unwrap());
        if frames.len() == 3 {
            break;
        }
    }
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].width(), 640);
    assert_eq!(frames[2].frame_index(), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn separate_windows_use_separate_cursors() {
    let config = Configuration {
        backend: Backend::Mock,
        ..Configuration::default()
    };
    let late: Vec<_> = config
        .window(100, Some(3))
        .create_provider()
        .unwrap()
        .open()
        .collect()
        .await;
    let early: Vec<_> = config
        .window(0, Some(3))
        .create_provider()
        .unwrap()
        .open()
        .collect()
        .await;
    assert_eq!(late[0].as_ref().unwrap().frame_index(), Some(100));
    assert_eq!(early[0].as_ref().unwrap().frame_index(), Some(0));
}
