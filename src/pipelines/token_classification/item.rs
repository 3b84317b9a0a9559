/// A sentence for token classification
pub trait Item: Send + Sync + Clone {
    /// The words of the sentence
    fn words(&self) -> &[String];

    /// The tag of each word
    fn tags(&self) -> &[String];
}
