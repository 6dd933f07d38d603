// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::{Value, json};

use crate::codec::{Map, get_f64};
use crate::content::{BaseContent, ContentType, map_content};
use crate::transportable::TransportableData;

map_content!(
    /// File, image, audio and video attachments.
    ///
    /// Small files travel inline in `data`, larger ones are uploaded elsewhere and referenced by
    /// `URL`, encrypted with the symmetric key carried in `key`. Attachment fields are stored in
    /// their transportable string form, the content map is ready for serialization at all times.
    FileContent
);

impl FileContent {
    pub fn new(
        content_type: ContentType,
        filename: Option<&str>,
        data: Option<&TransportableData>,
    ) -> Self {
        let mut base = BaseContent::new(content_type);
        base.set_str("filename", filename);
        if let Some(data) = data {
            base.set("data", json!(data.serialize()));
        }
        Self(base)
    }

    pub fn file(filename: &str, data: &TransportableData) -> Self {
        Self::new(ContentType::FILE, Some(filename), Some(data))
    }

    pub fn image(filename: &str, data: &TransportableData) -> Self {
        Self::new(ContentType::IMAGE, Some(filename), Some(data))
    }

    pub fn audio(filename: &str, data: &TransportableData) -> Self {
        Self::new(ContentType::AUDIO, Some(filename), Some(data))
    }

    pub fn video(filename: &str, data: &TransportableData) -> Self {
        Self::new(ContentType::VIDEO, Some(filename), Some(data))
    }

    pub fn filename(&self) -> Option<&str> {
        self.0.get_str("filename")
    }

    /// Inline file data.
    pub fn data(&self) -> Option<TransportableData> {
        self.0.get_str("data").map(TransportableData::parse)
    }

    pub fn set_data(&mut self, data: Option<&TransportableData>) {
        let data = data.map(TransportableData::serialize);
        self.0.set_str("data", data.as_deref());
    }

    /// Download location of an uploaded file.
    pub fn url(&self) -> Option<&str> {
        self.0.get_str("URL")
    }

    pub fn set_url(&mut self, url: Option<&str>) {
        self.0.set_str("URL", url);
    }

    /// Map of the symmetric key the uploaded file was encrypted with.
    pub fn password(&self) -> Option<&Map> {
        self.0.get("key").and_then(Value::as_object)
    }

    pub fn set_password(&mut self, key: Option<Map>) {
        match key {
            Some(key) => self.0.set("key", Value::Object(key)),
            None => {
                self.0.remove("key");
            }
        }
    }

    /// Preview of images and videos.
    pub fn thumbnail(&self) -> Option<TransportableData> {
        self.0.get_str("thumbnail").map(TransportableData::parse)
    }

    pub fn set_thumbnail(&mut self, thumbnail: Option<&TransportableData>) {
        let thumbnail = thumbnail.map(TransportableData::serialize);
        self.0.set_str("thumbnail", thumbnail.as_deref());
    }

    /// Length of audio and video files in seconds.
    pub fn duration(&self) -> Option<f64> {
        get_f64(self.0.as_map(), "duration")
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.0.set("duration", json!(duration));
    }

    /// Still frame of a video.
    pub fn snapshot(&self) -> Option<&str> {
        self.0.get_str("snapshot")
    }

    pub fn set_snapshot(&mut self, url: Option<&str>) {
        self.0.set_str("snapshot", url);
    }
}

#[cfg(test)]
mod tests {
    use crate::content::ContentType;
    use crate::transportable::{Encoding, TransportableData};

    use super::FileContent;

    #[test]
    fn inline_image() {
        let data = TransportableData::data_uri("image/png", &[1, 2, 3]);
        let mut image = FileContent::image("panda.png", &data);
        image.set_thumbnail(Some(&TransportableData::new(&[9])));

        assert_eq!(image.content_type(), ContentType::IMAGE);
        assert_eq!(image.filename(), Some("panda.png"));
        assert_eq!(
            image.as_map().get("data"),
            Some(&serde_json::json!("data:image/png;base64,AQID"))
        );
        assert_eq!(image.data().unwrap().bytes(), &[1, 2, 3]);
        assert_eq!(image.thumbnail().unwrap().bytes(), &[9]);
    }

    #[test]
    fn zero_length_file() {
        let file = FileContent::file("empty.txt", &TransportableData::new(&[]));
        let data = file.data().unwrap();
        assert_eq!(data.encoding(), Encoding::Plain);
        assert_eq!(data.len(), 0);
    }

    #[test]
    fn uploaded_video() {
        let mut video = FileContent::new(ContentType::VIDEO, Some("movie.mp4"), None);
        video.set_url(Some("https://cdn.example/movie.mp4"));
        video.set_duration(42.5);
        assert!(video.data().is_none());
        assert_eq!(video.url(), Some("https://cdn.example/movie.mp4"));
        assert_eq!(video.duration(), Some(42.5));

        video.set_url(None);
        assert!(video.url().is_none());
    }
}
